//! The [`QueryExpr`] facade: a parsed expression with its placeholder bindings.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::Arc;

use ddbrowse_model::{AttributeValue, Item, QueryExecutionPlan, ResultSet, TableInfo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::QueryExprConfig;
use crate::error::{QueryExprError, Result};
use crate::expression::ast::QueryAst;
use crate::expression::builtins::{SystemTimeSource, TimeSource};
use crate::expression::evaluator::EvalContext;
use crate::expression::parser::parse_query;
use crate::plan::plan_query;

/// A parsed query expression.
///
/// Binding placeholders or swapping the clock returns a new expression that
/// shares the parsed tree with the original.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use ddbrowse_model::{AttributeValue, Item};
/// use ddbrowse_queryexpr::QueryExpr;
///
/// let expr = QueryExpr::parse(r#"name^="al""#).unwrap();
/// assert_eq!(expr.to_string(), r#"name ^= "al""#);
///
/// let item: Item = HashMap::from([("name".to_owned(), AttributeValue::string("alpha"))]);
/// assert_eq!(expr.eval_item(&item).unwrap(), Some(AttributeValue::Bool(true)));
/// ```
#[derive(Debug, Clone)]
pub struct QueryExpr {
    ast: Arc<QueryAst>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
    time_source: Arc<dyn TimeSource>,
    config: QueryExprConfig,
}

impl QueryExpr {
    /// Parses expression text.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedToken` or `InvalidToken` if the text is not a valid
    /// expression.
    pub fn parse(input: &str) -> Result<Self> {
        let ast = parse_query(input)?;
        Ok(Self {
            ast: Arc::new(ast),
            names: HashMap::new(),
            values: HashMap::new(),
            time_source: Arc::new(SystemTimeSource),
            config: QueryExprConfig::default(),
        })
    }

    /// The parsed tree.
    #[must_use]
    pub fn ast(&self) -> &QueryAst {
        &self.ast
    }

    /// Returns a copy bound to the given `:name` placeholders.
    #[must_use]
    pub fn with_name_params(&self, params: HashMap<String, String>) -> Self {
        Self {
            names: params,
            ..self.clone()
        }
    }

    /// Returns a copy bound to the given `$value` placeholders.
    #[must_use]
    pub fn with_value_params(&self, params: HashMap<String, AttributeValue>) -> Self {
        Self {
            values: params,
            ..self.clone()
        }
    }

    /// Returns a copy reading `_x_now()` from `time_source`.
    #[must_use]
    pub fn with_time_source(&self, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            time_source,
            ..self.clone()
        }
    }

    /// Returns a copy using `config`.
    #[must_use]
    pub fn with_config(&self, config: QueryExprConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    /// The attribute name bound to `:name`.
    #[must_use]
    pub fn name_param(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    /// The value bound to `$name`.
    #[must_use]
    pub fn value_param(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    fn ctx(&self) -> EvalContext<'_> {
        EvalContext {
            names: &self.names,
            values: &self.values,
            time_source: self.time_source.as_ref(),
            config: &self.config,
        }
    }

    /// Plans the expression as a Query or a Scan of `table`.
    ///
    /// # Errors
    ///
    /// Returns `QueryExprError` if the expression is not a condition or cannot
    /// be expressed as a DynamoDB condition expression.
    pub fn plan(&self, table: &TableInfo) -> Result<QueryExecutionPlan> {
        plan_query(&self.ast, self.ctx(), table)
    }

    /// Evaluates the expression against `item`.
    ///
    /// # Errors
    ///
    /// Returns `QueryExprError` if evaluation fails.
    pub fn eval_item(&self, item: &Item) -> Result<Option<AttributeValue>> {
        self.ctx().eval_item(&self.ast.expr, item)
    }

    /// Writes `value` to the attribute path the expression names.
    ///
    /// # Errors
    ///
    /// Returns `PathNotSettable` if the expression is not an attribute path.
    pub fn set_eval_item(&self, item: &mut Item, value: AttributeValue) -> Result<()> {
        self.ctx().set_eval_item(&self.ast.expr, item, value)
    }

    /// Removes the attribute path the expression names.
    ///
    /// # Errors
    ///
    /// Returns `PathNotSettable` if the expression is not an attribute path.
    pub fn delete_attribute(&self, item: &mut Item) -> Result<()> {
        self.ctx().delete_attribute(&self.ast.expr, item)
    }

    /// Writes `value` into item `index` of `result_set` and marks it dirty.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchItem` if the result set has no item at `index`.
    pub fn set_eval_item_in(
        &self,
        result_set: &mut ResultSet,
        index: usize,
        value: AttributeValue,
    ) -> Result<()> {
        let item = result_set
            .item_mut(index)
            .ok_or(QueryExprError::NoSuchItem { index })?;
        self.set_eval_item(item, value)?;
        result_set.set_dirty(index, true);
        Ok(())
    }

    /// Removes the attribute path from item `index` of `result_set` and marks
    /// it dirty.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchItem` if the result set has no item at `index`.
    pub fn delete_attribute_in(&self, result_set: &mut ResultSet, index: usize) -> Result<()> {
        let item = result_set
            .item_mut(index)
            .ok_or(QueryExprError::NoSuchItem { index })?;
        self.delete_attribute(item)?;
        result_set.set_dirty(index, true);
        Ok(())
    }

    /// Returns `true` if the expression names an attribute path that can be
    /// written to or deleted.
    #[must_use]
    pub fn is_modifiable_path(&self) -> bool {
        self.ast.expr.is_path()
    }

    /// A hash of the canonical text and the bindings.
    #[must_use]
    pub fn hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Writes the expression and its bindings as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if writing fails.
    pub fn serialize_to(&self, writer: impl Write) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Reads an expression written by [`QueryExpr::serialize_to`].
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the input is not a stored expression.
    pub fn deserialize_from(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    fn sorted_names(&self) -> BTreeMap<&str, &str> {
        self.names
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    fn sorted_values(&self) -> BTreeMap<&str, &AttributeValue> {
        self.values.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ast)
    }
}

impl FromStr for QueryExpr {
    type Err = QueryExprError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for QueryExpr {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
            && self.names == other.names
            && self.values == other.values
    }
}

impl Eq for QueryExpr {}

impl Hash for QueryExpr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
        self.sorted_names().hash(state);
        self.sorted_values().hash(state);
    }
}

/// Serialized form of a [`QueryExpr`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredQueryExpr {
    expr: String,
    #[serde(default)]
    names: BTreeMap<String, String>,
    #[serde(default)]
    values: BTreeMap<String, AttributeValue>,
}

impl Serialize for QueryExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        StoredQueryExpr {
            expr: self.to_string(),
            names: self.names.clone().into_iter().collect(),
            values: self.values.clone().into_iter().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let stored = StoredQueryExpr::deserialize(deserializer)?;
        let expr = Self::parse(&stored.expr).map_err(serde::de::Error::custom)?;
        Ok(expr
            .with_name_params(stored.names.into_iter().collect())
            .with_value_params(stored.values.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ddbrowse_model::KeyAttribute;

    use super::*;
    use crate::expression::builtins::FixedTimeSource;

    fn make_item() -> Item {
        let charlie = HashMap::from([
            ("door".to_owned(), AttributeValue::string("red")),
            ("tree".to_owned(), AttributeValue::string("green")),
        ]);
        HashMap::from([
            ("alpha".to_owned(), AttributeValue::string("alpha")),
            ("bravo".to_owned(), AttributeValue::number("123")),
            ("charlie".to_owned(), AttributeValue::M(charlie)),
        ])
    }

    #[test]
    fn test_should_print_canonical_text() {
        let expr: QueryExpr = r#"pk="a"and(sk>=1)"#.parse().unwrap();
        assert_eq!(expr.to_string(), r#"pk = "a" and (sk >= 1)"#);
        let again = QueryExpr::parse(&expr.to_string()).unwrap();
        assert_eq!(again, expr);
    }

    #[test]
    fn test_should_bind_placeholders() {
        let item = HashMap::from([("foo".to_owned(), AttributeValue::string("bar"))]);
        let expr = QueryExpr::parse(":name = $value").unwrap();
        assert!(matches!(
            expr.eval_item(&item),
            Err(QueryExprError::MissingPlaceholder { .. })
        ));

        let bound = expr
            .with_name_params(HashMap::from([("name".to_owned(), "foo".to_owned())]))
            .with_value_params(HashMap::from([(
                "value".to_owned(),
                AttributeValue::string("bar"),
            )]));
        assert_eq!(bound.eval_item(&item).unwrap(), Some(AttributeValue::Bool(true)));
        assert_eq!(bound.name_param("name"), Some("foo"));
        assert_eq!(bound.value_param("value"), Some(&AttributeValue::string("bar")));
        assert_eq!(expr.name_param("name"), None);
    }

    #[test]
    fn test_should_use_injected_time_source() {
        let clock = FixedTimeSource(Utc.with_ymd_and_hms(2022, 10, 20, 9, 0, 0).unwrap());
        let expr = QueryExpr::parse("_x_now()")
            .unwrap()
            .with_time_source(Arc::new(clock));
        assert_eq!(
            expr.eval_item(&Item::new()).unwrap(),
            Some(AttributeValue::number("1666256400"))
        );

        let disabled = expr.with_config(QueryExprConfig::builder().private_builtins(false).build());
        assert!(matches!(
            disabled.eval_item(&Item::new()),
            Err(QueryExprError::UnrecognisedFunction { .. })
        ));
    }

    #[test]
    fn test_should_plan_against_table() {
        let table = TableInfo::new("test", KeyAttribute::new("pk").with_sort_key("sk"));
        let plan = QueryExpr::parse(r#"pk = "x""#).unwrap().plan(&table).unwrap();
        assert!(plan.can_query);
        assert_eq!(plan.key_condition.as_deref(), Some("#0 = :0"));
    }

    #[test]
    fn test_should_report_modifiable_paths() {
        assert!(QueryExpr::parse("pk").unwrap().is_modifiable_path());
        assert!(QueryExpr::parse("a.b[1]").unwrap().is_modifiable_path());
        assert!(QueryExpr::parse(":n.b").unwrap().is_modifiable_path());
        assert!(!QueryExpr::parse("pk and sk").unwrap().is_modifiable_path());
        assert!(!QueryExpr::parse("not pk").unwrap().is_modifiable_path());
        assert!(!QueryExpr::parse("$v").unwrap().is_modifiable_path());
    }

    #[test]
    fn test_should_mark_result_set_items_dirty() {
        let table = TableInfo::new("test", KeyAttribute::new("pk"));
        let mut result_set = ResultSet::new(table, vec![make_item(), make_item()]);
        result_set.clear_dirty();

        let expr = QueryExpr::parse("charlie.tree").unwrap();
        expr.set_eval_item_in(&mut result_set, 1, AttributeValue::string("Birch"))
            .unwrap();
        assert!(!result_set.is_dirty(0));
        assert!(result_set.is_dirty(1));
        let tree = &result_set.item(1).unwrap()["charlie"].as_m().unwrap()["tree"];
        assert_eq!(tree, &AttributeValue::string("Birch"));

        QueryExpr::parse("alpha")
            .unwrap()
            .delete_attribute_in(&mut result_set, 0)
            .unwrap();
        assert!(result_set.is_dirty(0));
        assert!(!result_set.item(0).unwrap().contains_key("alpha"));

        assert!(matches!(
            expr.set_eval_item_in(&mut result_set, 5, AttributeValue::Null(true)),
            Err(QueryExprError::NoSuchItem { index: 5 })
        ));
    }

    #[test]
    fn test_should_compare_and_hash_by_text_and_bindings() {
        let a = QueryExpr::parse(r#"pk="x""#).unwrap();
        let b = QueryExpr::parse(r#"pk = "x""#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());

        let bound = a.with_value_params(HashMap::from([("v".to_owned(), AttributeValue::number("1"))]));
        assert_ne!(a, bound);
        assert_ne!(a.hash_code(), bound.hash_code());
    }

    #[test]
    fn test_should_round_trip_through_json() {
        let mut dict = HashMap::new();
        dict.insert("alpha".to_owned(), AttributeValue::string("apple"));
        dict.insert("bravo".to_owned(), AttributeValue::string("banana"));
        let expr = QueryExpr::parse(r#":k = $dict.alpha using scan"#)
            .unwrap()
            .with_name_params(HashMap::from([("k".to_owned(), "pk".to_owned())]))
            .with_value_params(HashMap::from([("dict".to_owned(), AttributeValue::M(dict))]));

        let mut buf = Vec::new();
        expr.serialize_to(&mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["expr"], r#":k = $dict.alpha using scan"#);
        assert_eq!(json["names"]["k"], "pk");
        assert_eq!(json["values"]["dict"]["M"]["alpha"]["S"], "apple");

        let restored = QueryExpr::deserialize_from(buf.as_slice()).unwrap();
        assert_eq!(restored, expr);
        let dict = restored.value_param("dict").and_then(AttributeValue::as_m).unwrap();
        assert_eq!(dict["bravo"], AttributeValue::string("banana"));
    }

    #[test]
    fn test_should_reject_invalid_stored_expressions() {
        let err = QueryExpr::deserialize_from(r#"{"expr": "a ="}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, QueryExprError::Serialization(_)));
    }
}
