//! Interpreter for query expressions.
//!
//! Evaluation produces an [`ExprValue`]: attribute references stay lazy proxies
//! until an operator needs their value, so the same machinery serves reads
//! ([`EvalContext::eval_item`]) and writes ([`EvalContext::set_eval_item`],
//! [`EvalContext::delete_attribute`]).

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use bigdecimal::ToPrimitive;
use ddbrowse_model::attribute_value::TYPE_CODES;
use ddbrowse_model::{AttributeValue, Item};
use tracing::debug;

use super::ast::{CompareOp, Expr, InCandidates, Literal, Placeholder, PlaceholderKind};
use super::builtins::{Builtin, BuiltinContext, TimeSource};
use super::value::{ExprValue, ItemPath, PathSegment};
use crate::config::QueryExprConfig;
use crate::error::{QueryExprError, Result};

// ---------------------------------------------------------------------------
// Evaluation context
// ---------------------------------------------------------------------------

/// Placeholder bindings and environment an expression is evaluated with.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// `:name` placeholder bindings.
    pub names: &'a HashMap<String, String>,
    /// `$value` placeholder bindings.
    pub values: &'a HashMap<String, AttributeValue>,
    /// Clock for `_x_now()`.
    pub time_source: &'a dyn TimeSource,
    /// Engine configuration.
    pub config: &'a QueryExprConfig,
}

impl EvalContext<'_> {
    /// Evaluates `expr` against `item` and returns the value it produces.
    ///
    /// `None` means the expression refers to an attribute the item does not have.
    ///
    /// # Errors
    ///
    /// Returns `QueryExprError` if a placeholder is unbound, a path walks into a
    /// scalar, or an operator receives values it cannot handle.
    pub fn eval_item(&self, expr: &Expr, item: &Item) -> Result<Option<AttributeValue>> {
        self.eval(expr, item)?.into_value(item)
    }

    /// Evaluates `expr` without resolving the final proxy.
    pub fn eval(&self, expr: &Expr, item: &Item) -> Result<ExprValue> {
        match expr {
            Expr::Name(name) => Ok(ExprValue::Proxy(ItemPath::root(name.clone()))),
            Expr::Placeholder(placeholder) => self.eval_placeholder(placeholder),
            Expr::Literal(literal) => Ok(ExprValue::Owned(literal_value(literal))),
            Expr::Paren(inner) => self.eval(inner, item),
            Expr::Dot { base, field } => self
                .eval(base, item)?
                .child(PathSegment::Key(field.clone()), &**base),
            Expr::Index { base, index } => {
                let segment = self.subref(index, item)?;
                self.eval(base, item)?.child(segment, &**base)
            }
            Expr::Or(operands) => {
                for operand in operands {
                    if self.truthy(operand, item)? {
                        return Ok(boolean(true));
                    }
                }
                Ok(boolean(false))
            }
            Expr::And(operands) => {
                for operand in operands {
                    if !self.truthy(operand, item)? {
                        return Ok(boolean(false));
                    }
                }
                Ok(boolean(true))
            }
            Expr::Not(inner) => Ok(boolean(!self.truthy(inner, item)?)),
            Expr::Compare { left, op, right } => {
                self.eval_compare(left, *op, right, item).map(boolean)
            }
            Expr::In {
                operand,
                negated,
                candidates,
            } => {
                let found = match candidates {
                    InCandidates::List(list) => self.eval_in_list(operand, list, item)?,
                    InCandidates::Single(haystack) => self.eval_in_single(operand, haystack, item)?,
                };
                Ok(boolean(found != *negated))
            }
            Expr::Is {
                operand,
                negated,
                type_name,
            } => {
                let matches = self.eval_is(operand, type_name, item)?;
                Ok(boolean(matches != *negated))
            }
            Expr::Between { operand, low, high } => {
                self.eval_between(operand, low, high, item).map(boolean)
            }
            Expr::Call { function, args } => self.eval_call(function, args, item),
        }
    }

    fn eval_placeholder(&self, placeholder: &Placeholder) -> Result<ExprValue> {
        match placeholder.kind {
            PlaceholderKind::Name => self
                .names
                .get(&placeholder.name)
                .map(|name| ExprValue::Proxy(ItemPath::root(name.clone())))
                .ok_or_else(|| missing_placeholder(placeholder)),
            PlaceholderKind::Value => self
                .values
                .get(&placeholder.name)
                .map(|value| ExprValue::Owned(value.clone()))
                .ok_or_else(|| missing_placeholder(placeholder)),
        }
    }

    /// Resolves the name a `:name` placeholder or bare identifier refers to.
    fn attribute_name(&self, expr: &Expr) -> Result<Option<String>> {
        match expr {
            Expr::Name(name) => Ok(Some(name.clone())),
            Expr::Placeholder(
                placeholder @ Placeholder {
                    kind: PlaceholderKind::Name,
                    ..
                },
            ) => self
                .names
                .get(&placeholder.name)
                .cloned()
                .map(Some)
                .ok_or_else(|| missing_placeholder(placeholder)),
            _ => Ok(None),
        }
    }

    fn resolved(&self, expr: &Expr, item: &Item) -> Result<Option<AttributeValue>> {
        self.eval(expr, item)?.into_value(item)
    }

    fn truthy(&self, expr: &Expr, item: &Item) -> Result<bool> {
        Ok(self
            .resolved(expr, item)?
            .is_some_and(|value| value.is_truthy()))
    }

    /// Evaluates a subscript into a map key or a list index.
    pub(crate) fn subref(&self, index: &Expr, item: &Item) -> Result<PathSegment> {
        let value = self.resolved(index, item)?;
        let segment = match &value {
            Some(AttributeValue::S(key)) => Some(PathSegment::Key(key.clone())),
            Some(n @ AttributeValue::N(_)) => n
                .as_decimal()
                .filter(bigdecimal::BigDecimal::is_integer)
                .and_then(|d| d.to_i64())
                .map(PathSegment::Index),
            _ => None,
        };
        segment.ok_or_else(|| QueryExprError::ValueNotUsableAsASubref {
            value: describe(value.as_ref()),
        })
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn eval_compare(&self, left: &Expr, op: CompareOp, right: &Expr, item: &Item) -> Result<bool> {
        let lval = self.resolved(left, item)?;
        let rval = self.resolved(right, item)?;

        let holds = |wanted: fn(Ordering) -> bool| -> Result<bool> {
            compare(lval.as_ref(), rval.as_ref()).map(wanted)
        };
        match op {
            CompareOp::Eq => holds(Ordering::is_eq),
            CompareOp::Ne => holds(Ordering::is_ne),
            CompareOp::Lt => holds(Ordering::is_lt),
            CompareOp::Le => holds(Ordering::is_le),
            CompareOp::Gt => holds(Ordering::is_gt),
            CompareOp::Ge => holds(Ordering::is_ge),
            CompareOp::BeginsWith => {
                let Some(AttributeValue::S(prefix)) = &rval else {
                    return Err(QueryExprError::ValueMustBeString {
                        operand: right.to_string(),
                    });
                };
                let subject = lval
                    .as_ref()
                    .and_then(AttributeValue::string_form)
                    .ok_or_else(|| QueryExprError::ValueNotConvertableToString {
                        value: describe(lval.as_ref()),
                    })?;
                Ok(subject.starts_with(prefix.as_str()))
            }
        }
    }

    fn eval_in_list(&self, operand: &Expr, list: &[Expr], item: &Item) -> Result<bool> {
        let needle = self.resolved(operand, item)?;
        let Some(needle) = &needle else {
            return Ok(false);
        };
        for candidate in list {
            if let Some(candidate) = self.resolved(candidate, item)? {
                if needle.compare_scalar(&candidate) == Some(Ordering::Equal) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn eval_in_single(&self, operand: &Expr, haystack: &Expr, item: &Item) -> Result<bool> {
        let needle = self.resolved(operand, item)?;
        let haystack_value = self.eval(haystack, item)?;
        let haystack = haystack_value.resolve(item)?;
        contains(haystack.as_deref(), needle.as_ref())
    }

    fn eval_is(&self, operand: &Expr, type_name: &Expr, item: &Item) -> Result<bool> {
        let Some(AttributeValue::S(name)) = self.resolved(type_name, item)? else {
            return Err(QueryExprError::ValueMustBeString {
                operand: type_name.to_string(),
            });
        };
        let value = self.resolved(operand, item)?;
        let wanted = name.to_ascii_uppercase();
        if wanted == "ANY" {
            Ok(value.is_some())
        } else if TYPE_CODES.contains(&wanted.as_str()) {
            Ok(value.is_some_and(|v| v.type_descriptor() == wanted))
        } else {
            Err(QueryExprError::InvalidTypeForIs { type_name: name })
        }
    }

    fn eval_between(&self, operand: &Expr, low: &Expr, high: &Expr, item: &Item) -> Result<bool> {
        let value = self.resolved(operand, item)?;
        let low = self.resolved(low, item)?;
        let high = self.resolved(high, item)?;

        let (Some(v), Some(lo), Some(hi)) = (&value, &low, &high) else {
            let right = if value.is_none() { low.as_ref() } else { None };
            return Err(QueryExprError::ValuesNotComparable {
                left: describe(value.as_ref()),
                right: describe(right),
            });
        };

        for bound in [lo, hi] {
            if bound.type_descriptor() != v.type_descriptor() {
                return Err(QueryExprError::ValuesNotComparable {
                    left: v.to_string(),
                    right: bound.to_string(),
                });
            }
        }
        if !matches!(v, AttributeValue::S(_) | AttributeValue::N(_) | AttributeValue::B(_)) {
            return Err(QueryExprError::InvalidTypeForBetween {
                type_name: v.type_descriptor().to_owned(),
            });
        }

        let above_low = compare(Some(v), Some(lo))? != Ordering::Less;
        let below_high = compare(Some(v), Some(hi))? != Ordering::Greater;
        Ok(above_low && below_high)
    }

    fn eval_call(&self, function: &Expr, args: &[Expr], item: &Item) -> Result<ExprValue> {
        let name = function
            .bare_name()
            .ok_or_else(|| QueryExprError::OperandNotAName {
                operand: function.to_string(),
            })?;
        let builtin = Builtin::lookup(name, self.config).ok_or_else(|| {
            QueryExprError::UnrecognisedFunction {
                name: name.to_owned(),
            }
        })?;
        let args = args
            .iter()
            .map(|arg| self.resolved(arg, item))
            .collect::<Result<Vec<_>>>()?;
        builtin.call(&args, &self.builtin_context()).map(ExprValue::Owned)
    }

    pub(crate) fn builtin_context(&self) -> BuiltinContext<'_> {
        BuiltinContext {
            time_source: self.time_source,
            config: self.config,
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Writes `value` into the slot of `item` that `expr` names.
    ///
    /// # Errors
    ///
    /// Returns `PathNotSettable` unless `expr` is an attribute path, and a
    /// traversal error if the path's parent does not exist or has the wrong kind.
    pub fn set_eval_item(&self, expr: &Expr, item: &mut Item, value: AttributeValue) -> Result<()> {
        if let Some(name) = self.attribute_name(expr)? {
            debug!(attribute = %name, "setting attribute");
            item.insert(name, value);
            return Ok(());
        }
        match expr {
            Expr::Paren(inner) => self.set_eval_item(inner, item, value),
            Expr::Dot { base, field } if base.is_path() => {
                debug!(path = %expr, "setting attribute");
                let parent = self.eval(base, item)?;
                parent.set_value_of(item, field, value)
            }
            Expr::Index { base, index } if base.is_path() => {
                debug!(path = %expr, "setting attribute");
                let segment = self.subref(index, item)?;
                let parent = self.eval(base, item)?;
                match segment {
                    PathSegment::Key(key) => parent.set_value_of(item, &key, value),
                    PathSegment::Index(idx) => parent.set_value_at(item, idx, value),
                }
            }
            _ => Err(QueryExprError::PathNotSettable),
        }
    }

    /// Removes the slot of `item` that `expr` names. Absent slots are ignored.
    ///
    /// # Errors
    ///
    /// Same conditions as [`EvalContext::set_eval_item`].
    pub fn delete_attribute(&self, expr: &Expr, item: &mut Item) -> Result<()> {
        if let Some(name) = self.attribute_name(expr)? {
            debug!(attribute = %name, "deleting attribute");
            item.remove(&name);
            return Ok(());
        }
        match expr {
            Expr::Paren(inner) => self.delete_attribute(inner, item),
            Expr::Dot { base, field } if base.is_path() => {
                debug!(path = %expr, "deleting attribute");
                let parent = self.eval(base, item)?;
                parent.delete_value_of(item, field)
            }
            Expr::Index { base, index } if base.is_path() => {
                debug!(path = %expr, "deleting attribute");
                let segment = self.subref(index, item)?;
                let parent = self.eval(base, item)?;
                match segment {
                    PathSegment::Key(key) => parent.delete_value_of(item, &key),
                    PathSegment::Index(idx) => parent.delete_value_at(item, idx),
                }
            }
            _ => Err(QueryExprError::PathNotSettable),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn boolean(b: bool) -> ExprValue {
    ExprValue::Owned(AttributeValue::Bool(b))
}

fn missing_placeholder(placeholder: &Placeholder) -> QueryExprError {
    QueryExprError::MissingPlaceholder {
        placeholder: placeholder.to_string(),
    }
}

/// The attribute value a literal denotes.
pub(crate) fn literal_value(literal: &Literal) -> AttributeValue {
    match literal {
        Literal::String(s) => AttributeValue::S(s.clone()),
        Literal::Number(n) => AttributeValue::N(n.clone()),
        Literal::Bool(b) => AttributeValue::Bool(*b),
    }
}

/// Renders a possibly missing value for error messages.
pub(crate) fn describe(value: Option<&AttributeValue>) -> String {
    value.map_or_else(|| "missing".to_owned(), ToString::to_string)
}

/// Orders two values of the same scalar kind.
fn compare(left: Option<&AttributeValue>, right: Option<&AttributeValue>) -> Result<Ordering> {
    left.zip(right)
        .and_then(|(l, r)| l.compare_scalar(r))
        .ok_or_else(|| QueryExprError::ValuesNotComparable {
            left: describe(left),
            right: describe(right),
        })
}

fn string_form_of(value: Option<&AttributeValue>) -> Result<Cow<'_, str>> {
    value
        .and_then(AttributeValue::string_form)
        .ok_or_else(|| QueryExprError::ValueNotConvertableToString {
            value: describe(value),
        })
}

/// Membership test for the single-operand form of `in`.
fn contains(haystack: Option<&AttributeValue>, needle: Option<&AttributeValue>) -> Result<bool> {
    match haystack {
        Some(AttributeValue::S(s)) => Ok(s.contains(string_form_of(needle)?.as_ref())),
        Some(AttributeValue::M(map)) => Ok(map.contains_key(string_form_of(needle)?.as_ref())),
        Some(AttributeValue::L(list)) => Ok(needle.is_some_and(|n| {
            list.iter()
                .any(|v| n.compare_scalar(v) == Some(Ordering::Equal))
        })),
        Some(AttributeValue::Ss(set)) => Ok(matches!(needle, Some(AttributeValue::S(s)) if set.contains(s))),
        Some(AttributeValue::Ns(set)) => Ok(needle.is_some_and(|n| {
            n.is_n()
                && set
                    .iter()
                    .any(|m| n.compare_scalar(&AttributeValue::N(m.clone())) == Some(Ordering::Equal))
        })),
        Some(AttributeValue::Bs(set)) => Ok(matches!(needle, Some(AttributeValue::B(b)) if set.contains(b))),
        other => Err(QueryExprError::ValuesNotInnable {
            value: describe(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::expression::builtins::FixedTimeSource;
    use crate::expression::parser::parse_query;

    fn make_item() -> Item {
        let mut charlie = HashMap::new();
        charlie.insert("door".to_owned(), AttributeValue::string("red"));
        charlie.insert("tree".to_owned(), AttributeValue::string("green"));

        let mut item = Item::new();
        item.insert("alpha".to_owned(), AttributeValue::string("alpha"));
        item.insert("bravo".to_owned(), AttributeValue::number("123"));
        item.insert("charlie".to_owned(), AttributeValue::M(charlie));
        item.insert(
            "prime".to_owned(),
            AttributeValue::L(["2", "3", "5", "7"].map(AttributeValue::number).to_vec()),
        );
        item.insert("three".to_owned(), AttributeValue::number("3"));
        item
    }

    struct Fixture {
        names: HashMap<String, String>,
        values: HashMap<String, AttributeValue>,
        clock: FixedTimeSource,
        config: QueryExprConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let names = HashMap::from([
                ("theBName".to_owned(), "bravo".to_owned()),
                ("theCMap".to_owned(), "charlie".to_owned()),
            ]);
            let values = HashMap::from([("a".to_owned(), AttributeValue::string("alpha"))]);
            Self {
                names,
                values,
                clock: FixedTimeSource(Utc.with_ymd_and_hms(2022, 10, 20, 9, 0, 0).unwrap()),
                config: QueryExprConfig::default(),
            }
        }

        fn ctx(&self) -> EvalContext<'_> {
            EvalContext {
                names: &self.names,
                values: &self.values,
                time_source: &self.clock,
                config: &self.config,
            }
        }

        fn eval(&self, input: &str, item: &Item) -> Result<Option<AttributeValue>> {
            let ast = parse_query(input).unwrap();
            self.ctx().eval_item(&ast.expr, item)
        }
    }

    fn assert_bool(input: &str, expected: bool) {
        let fixture = Fixture::new();
        let result = fixture.eval(input, &make_item()).unwrap();
        assert_eq!(result, Some(AttributeValue::Bool(expected)), "{input}");
    }

    #[test]
    fn test_should_evaluate_simple_values() {
        let fixture = Fixture::new();
        let item = make_item();
        assert_eq!(
            fixture.eval("alpha", &item).unwrap(),
            Some(AttributeValue::string("alpha"))
        );
        assert_eq!(
            fixture.eval("bravo", &item).unwrap(),
            Some(AttributeValue::number("123"))
        );
        assert_eq!(fixture.eval("charlie", &item).unwrap(), item.get("charlie").cloned());
        assert_eq!(fixture.eval("missing", &item).unwrap(), None);
    }

    #[test]
    fn test_should_evaluate_comparisons() {
        assert_bool(r#"alpha="alpha""#, true);
        assert_bool(r#"alpha!="not alpha""#, true);
        assert_bool("bravo=123", true);
        assert_bool(r#"charlie.tree="green""#, true);
        assert_bool(r#"alpha^="al""#, true);
        assert_bool(r#"alpha="foobar""#, false);
        assert_bool(r#"alpha^="need-something""#, false);

        assert_bool("three > 4", false);
        assert_bool("three >= 4", false);
        assert_bool("three < 4", true);
        assert_bool("three <= 4", true);
        assert_bool("three > 3", false);
        assert_bool("three >= 3", true);
        assert_bool("three < 3", false);
        assert_bool("three <= 3", true);
        assert_bool("three > 2", true);
        assert_bool("three >= 2", true);
        assert_bool("three < 2", false);
        assert_bool("three <= 2", false);
        assert_bool("three = 3.0", true);
    }

    #[test]
    fn test_should_evaluate_in() {
        assert_bool("three in (2, 3, 4, 5)", true);
        assert_bool("three in (20, 30, 40)", false);
        assert_bool(r#"alpha in ("alpha", "beta", "gamma", "delta")"#, true);
        assert_bool(r#"alpha in ("ey", "be", "see")"#, false);
        assert_bool(r#"alpha not in ("ey", "be", "see")"#, true);
        assert_bool("three in prime", true);
        assert_bool("1 in prime", false);
        assert_bool(r#""door" in charlie"#, true);
        assert_bool(r#""sky" in charlie"#, false);
        assert_bool(r#""al" in alpha"#, true);
        assert_bool(r#""cent" in "percentage""#, true);
        assert_bool(r#""cent" not in "percentage""#, false);
        assert_bool("three in range(1, 5)", true);
    }

    #[test]
    fn test_should_reject_in_on_scalars() {
        let fixture = Fixture::new();
        let err = fixture.eval("1 in three", &make_item()).unwrap_err();
        assert!(matches!(err, QueryExprError::ValuesNotInnable { ref value } if value == "3"));
        let err = fixture.eval("1 in missing", &make_item()).unwrap_err();
        assert!(matches!(err, QueryExprError::ValuesNotInnable { ref value } if value == "missing"));
    }

    #[test]
    fn test_should_evaluate_is() {
        assert_bool(r#"alpha is "S""#, true);
        assert_bool(r#"alpha is not "N""#, true);
        assert_bool(r#"three is "N""#, true);
        assert_bool(r#"three is not "S""#, true);
        assert_bool(r#"(three = 3) is "BOOL""#, true);
        assert_bool(r#"prime is "L""#, true);
        assert_bool(r#"charlie is "M""#, true);
        assert_bool(r#"alpha is "any""#, true);
        assert_bool(r#"three is "any""#, true);
        assert_bool(r#"(three = 3) is "any""#, true);
        assert_bool(r#"charlie is "any""#, true);
        assert_bool(r#"prime is "any""#, true);
        assert_bool(r#"undef is not "any""#, true);
        assert_bool(r#"undef is "S""#, false);
    }

    #[test]
    fn test_should_reject_unknown_types_for_is() {
        let fixture = Fixture::new();
        let err = fixture.eval(r#"alpha is "STRING""#, &make_item()).unwrap_err();
        assert!(matches!(err, QueryExprError::InvalidTypeForIs { ref type_name } if type_name == "STRING"));
        let err = fixture.eval("alpha is 1", &make_item()).unwrap_err();
        assert!(matches!(err, QueryExprError::ValueMustBeString { .. }));
    }

    #[test]
    fn test_should_evaluate_between() {
        assert_bool("three between 1 and 5", true);
        assert_bool("three between 3 and 3", true);
        assert_bool("three between 4 and 5", false);
        assert_bool(r#"alpha between "a" and "b""#, true);

        let fixture = Fixture::new();
        let err = fixture
            .eval(r#"three between "a" and 5"#, &make_item())
            .unwrap_err();
        assert!(matches!(err, QueryExprError::ValuesNotComparable { .. }));
        let err = fixture
            .eval("missing between 1 and 5", &make_item())
            .unwrap_err();
        assert!(matches!(err, QueryExprError::ValuesNotComparable { ref left, .. } if left == "missing"));
        let err = fixture
            .eval("true between false and true", &make_item())
            .unwrap_err();
        assert!(matches!(err, QueryExprError::InvalidTypeForBetween { ref type_name } if type_name == "BOOL"));
    }

    #[test]
    fn test_should_evaluate_functions() {
        let fixture = Fixture::new();
        let item = make_item();
        assert_eq!(fixture.eval("size(alpha)", &item).unwrap(), Some(AttributeValue::number("5")));
        assert_eq!(
            fixture.eval(r#"size("This is a test")"#, &item).unwrap(),
            Some(AttributeValue::number("14"))
        );
        assert_eq!(fixture.eval("size(charlie)", &item).unwrap(), Some(AttributeValue::number("2")));
        assert_eq!(fixture.eval("size(prime)", &item).unwrap(), Some(AttributeValue::number("4")));
        assert_eq!(
            fixture.eval("_x_now()", &item).unwrap(),
            Some(AttributeValue::number("1666256400"))
        );

        let err = fixture.eval("nope(alpha)", &item).unwrap_err();
        assert!(matches!(err, QueryExprError::UnrecognisedFunction { ref name } if name == "nope"));
    }

    #[test]
    fn test_should_evaluate_dots_and_subscripts() {
        let fixture = Fixture::new();
        let item = make_item();
        let red = Some(AttributeValue::string("red"));
        assert_eq!(fixture.eval("charlie.door", &item).unwrap(), red);
        assert_eq!(fixture.eval("(charlie).door", &item).unwrap(), red);
        assert_eq!(fixture.eval(r#"charlie["door"]"#, &item).unwrap(), red);
        assert_eq!(
            fixture.eval("charlie.tree", &item).unwrap(),
            Some(AttributeValue::string("green"))
        );
        assert_eq!(fixture.eval("prime[2]", &item).unwrap(), Some(AttributeValue::number("5")));
        assert_eq!(fixture.eval("prime[10]", &item).unwrap(), None);

        let err = fixture.eval("prime[true]", &item).unwrap_err();
        assert!(matches!(err, QueryExprError::ValueNotUsableAsASubref { ref value } if value == "true"));
    }

    #[test]
    fn test_should_evaluate_logic() {
        assert_bool(r#"alpha="alpha" and bravo=123"#, true);
        assert_bool(r#"alpha="alpha" and bravo=321"#, false);
        assert_bool(r#"alpha="bravo" and bravo=123"#, false);
        assert_bool(r#"alpha="bravo" and bravo=321"#, false);
        assert_bool(r#"alpha="alpha" and bravo=123 and charlie.door="red""#, true);
        assert_bool(r#"alpha="alpha" and bravo=123 and charlie.door^="green""#, false);

        assert_bool(r#"alpha="alpha" or bravo=123"#, true);
        assert_bool(r#"alpha="alpha" or bravo=321"#, true);
        assert_bool(r#"alpha="bravo" or bravo=123"#, true);
        assert_bool(r#"alpha="bravo" or bravo=321"#, false);
        assert_bool(r#"alpha="alpha" or bravo=123 or charlie.tree="green""#, true);
        assert_bool(r#"alpha="bravo" or bravo=321 or charlie.tree^="red""#, false);

        assert_bool(r#"not alpha="alpha""#, false);
        assert_bool(r#"not alpha!="alpha""#, true);

        assert_bool(r#"alpha="alpha" and bravo=123 or charlie.door="green""#, true);
        assert_bool(r#"alpha="bravo" or bravo=321 and charlie.door="green""#, false);
    }

    #[test]
    fn test_should_coerce_truthiness() {
        assert_bool("missing or alpha", true);
        assert_bool("missing and alpha", false);
        assert_bool(r#"not """#, true);
        assert_bool("not 0", true);
        assert_bool("not charlie", false);
    }

    #[test]
    fn test_should_short_circuit_logic() {
        // The right operand would fail if it were evaluated.
        assert_bool(r#"alpha = "alpha" or "abc" = 123"#, true);
        assert_bool(r#"alpha = "x" and "abc" = 123"#, false);
    }

    #[test]
    fn test_should_report_evaluation_errors() {
        let fixture = Fixture::new();
        let item = make_item();
        match fixture.eval("alpha.bravo", &item) {
            Err(QueryExprError::ValueNotAMap { path }) => assert_eq!(path, vec!["alpha", "bravo"]),
            other => panic!("expected ValueNotAMap, got {other:?}"),
        }
        match fixture.eval("charlie.tree.bla", &item) {
            Err(QueryExprError::ValueNotAMap { path }) => {
                assert_eq!(path, vec!["charlie", "tree", "bla"]);
            }
            other => panic!("expected ValueNotAMap, got {other:?}"),
        }
        match fixture.eval(r#""abc" = 123"#, &item) {
            Err(QueryExprError::ValuesNotComparable { left, right }) => {
                assert_eq!(left, r#""abc""#);
                assert_eq!(right, "123");
            }
            other => panic!("expected ValuesNotComparable, got {other:?}"),
        }
        assert!(matches!(
            fixture.eval("missing = 1", &item),
            Err(QueryExprError::ValuesNotComparable { .. })
        ));
        assert!(matches!(
            fixture.eval("alpha ^= 1", &item),
            Err(QueryExprError::ValueMustBeString { .. })
        ));
        assert!(matches!(
            fixture.eval(r#"charlie ^= "x""#, &item),
            Err(QueryExprError::ValueNotConvertableToString { .. })
        ));
    }

    #[test]
    fn test_should_resolve_placeholders() {
        let fixture = Fixture::new();
        let item = make_item();
        assert_eq!(
            fixture.eval("alpha = $a", &item).unwrap(),
            Some(AttributeValue::Bool(true))
        );
        assert_eq!(
            fixture.eval(":theBName = 123", &item).unwrap(),
            Some(AttributeValue::Bool(true))
        );
        assert_eq!(
            fixture.eval(":theCMap.door", &item).unwrap(),
            Some(AttributeValue::string("red"))
        );

        let err = fixture.eval("alpha = $nope", &item).unwrap_err();
        assert!(matches!(err, QueryExprError::MissingPlaceholder { ref placeholder } if placeholder == "$nope"));
        let err = fixture.eval(":nope", &item).unwrap_err();
        assert!(matches!(err, QueryExprError::MissingPlaceholder { ref placeholder } if placeholder == ":nope"));
    }

    fn set(input: &str, item: &mut Item, value: AttributeValue) -> Result<()> {
        let fixture = Fixture::new();
        let ast = parse_query(input).unwrap();
        fixture.ctx().set_eval_item(&ast.expr, item, value)
    }

    fn delete(input: &str, item: &mut Item) -> Result<()> {
        let fixture = Fixture::new();
        let ast = parse_query(input).unwrap();
        fixture.ctx().delete_attribute(&ast.expr, item)
    }

    #[test]
    fn test_should_set_attributes() {
        let mut item = make_item();
        set("alpha", &mut item, AttributeValue::string("not alpha")).unwrap();
        assert_eq!(item["alpha"], AttributeValue::string("not alpha"));

        set("charlie.tree", &mut item, AttributeValue::string("Birch")).unwrap();
        assert_eq!(
            item["charlie"].as_m().unwrap()["tree"],
            AttributeValue::string("Birch")
        );

        set(":theBName", &mut item, AttributeValue::number("1")).unwrap();
        assert_eq!(item["bravo"], AttributeValue::number("1"));

        set("prime[0]", &mut item, AttributeValue::number("11")).unwrap();
        assert_eq!(item["prime"].as_l().unwrap()[0], AttributeValue::number("11"));

        set(r#":theCMap["sky"]"#, &mut item, AttributeValue::string("blue")).unwrap();
        assert_eq!(
            item["charlie"].as_m().unwrap()["sky"],
            AttributeValue::string("blue")
        );
    }

    #[test]
    fn test_should_reject_unsettable_paths() {
        let mut item = make_item();
        for input in ["pk and sk", "not pk", "$a", "size(alpha)", r#""lit""#, "$a.b"] {
            let err = set(input, &mut item, AttributeValue::Null(true)).unwrap_err();
            assert!(matches!(err, QueryExprError::PathNotSettable), "{input}");
        }
        assert!(matches!(
            set("prime[9]", &mut item, AttributeValue::Null(true)),
            Err(QueryExprError::IndexOutOfRange { index: 9, .. })
        ));
        assert!(matches!(
            set("missing.x", &mut item, AttributeValue::Null(true)),
            Err(QueryExprError::NameNotFound { .. })
        ));
    }

    #[test]
    fn test_should_delete_attributes() {
        let mut item = make_item();
        delete("alpha", &mut item).unwrap();
        assert!(!item.contains_key("alpha"));

        delete("charlie.tree", &mut item).unwrap();
        assert!(!item["charlie"].as_m().unwrap().contains_key("tree"));

        delete(":theCMap.door", &mut item).unwrap();
        assert!(item["charlie"].as_m().unwrap().is_empty());

        delete("prime[0]", &mut item).unwrap();
        assert_eq!(item["prime"].as_l().unwrap().len(), 3);
        delete("prime[9]", &mut item).unwrap();
        assert_eq!(item["prime"].as_l().unwrap().len(), 3);

        delete("missing", &mut item).unwrap();
        assert!(matches!(
            delete("not alpha", &mut item),
            Err(QueryExprError::PathNotSettable)
        ));
    }
}
