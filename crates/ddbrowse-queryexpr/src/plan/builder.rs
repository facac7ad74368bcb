//! Renders IR predicates as DynamoDB condition expressions.
//!
//! Attribute names become `#n` placeholders and values become `:n`
//! placeholders, numbered in the order the tree is walked. Names are shared
//! between uses; every value occurrence gets its own placeholder.

use std::collections::{BTreeMap, HashMap};

use ddbrowse_model::AttributeValue;

use super::ir::{IrOperand, NamePath, Predicate};
use crate::expression::value::PathSegment;

/// Accumulates placeholder bindings while conditions are rendered.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    names: Vec<String>,
    name_index: HashMap<String, usize>,
    values: Vec<AttributeValue>,
}

impl ExpressionBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn name(&mut self, name: &str) -> String {
        let idx = match self.name_index.get(name) {
            Some(idx) => *idx,
            None => {
                let idx = self.names.len();
                self.names.push(name.to_owned());
                self.name_index.insert(name.to_owned(), idx);
                idx
            }
        };
        format!("#{idx}")
    }

    fn value(&mut self, value: &AttributeValue) -> String {
        let idx = self.values.len();
        self.values.push(value.clone());
        format!(":{idx}")
    }

    /// Leading map keys fold into the root name, so `a.b.c` binds a single
    /// placeholder. Steps after the first subscript are rendered one by one.
    fn name_path(&mut self, path: &NamePath) -> String {
        let leading = path
            .segments
            .iter()
            .take_while(|segment| matches!(segment, PathSegment::Key(_)))
            .count();
        let mut root = path.root.clone();
        for segment in &path.segments[..leading] {
            root.push('.');
            root.push_str(&segment.to_string());
        }

        let mut out = self.name(&root);
        for segment in &path.segments[leading..] {
            match segment {
                PathSegment::Index(idx) => out.push_str(&format!("[{idx}]")),
                PathSegment::Key(key) => {
                    let ph = self.name(key);
                    out.push('.');
                    out.push_str(&ph);
                }
            }
        }
        out
    }

    fn operand(&mut self, operand: &IrOperand) -> String {
        match operand {
            IrOperand::Name(path) => self.name_path(path),
            IrOperand::Value(value) => self.value(value),
            IrOperand::Size(path) => {
                let name = self.name_path(path);
                format!("size ({name})")
            }
        }
    }

    fn joined(&mut self, predicates: &[Predicate], sep: &str) -> String {
        let parts: Vec<String> = predicates
            .iter()
            .map(|p| format!("({})", self.filter(p)))
            .collect();
        parts.join(sep)
    }

    /// Renders a predicate as a filter expression.
    pub fn filter(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Or(operands) => self.joined(operands, " OR "),
            Predicate::And(operands) => self.joined(operands, " AND "),
            Predicate::Not(inner) => {
                let inner = self.filter(inner);
                format!("NOT ({inner})")
            }
            Predicate::Compare { left, op, right } => {
                let left = self.operand(left);
                let right = self.operand(right);
                format!("{left} {} {right}", op.symbol())
            }
            Predicate::BeginsWith { name, prefix } => {
                let name = self.name_path(name);
                let prefix = self.value(prefix);
                format!("begins_with ({name}, {prefix})")
            }
            Predicate::Between { name, low, high } => {
                let name = self.name_path(name);
                let low = self.operand(low);
                let high = self.operand(high);
                format!("{name} BETWEEN {low} AND {high}")
            }
            Predicate::In { name, values } => {
                let name = self.name_path(name);
                let values: Vec<String> = values.iter().map(|v| self.operand(v)).collect();
                format!("{name} IN ({})", values.join(", "))
            }
            Predicate::Contains { name, needle } => {
                let name = self.name_path(name);
                let needle = self.value(needle);
                format!("contains ({name}, {needle})")
            }
            Predicate::Exists { name, negated } => {
                let name = self.name_path(name);
                if *negated {
                    format!("attribute_not_exists ({name})")
                } else {
                    format!("attribute_exists ({name})")
                }
            }
            Predicate::AttributeType { name, type_code } => {
                let name = self.name_path(name);
                let type_code = self.value(&AttributeValue::S(type_code.clone()));
                format!("attribute_type ({name}, {type_code})")
            }
        }
    }

    /// Renders a key condition. The partition key condition always comes first.
    pub fn key_condition(&mut self, partition: &Predicate, sort: Option<&Predicate>) -> String {
        let partition = self.filter(partition);
        match sort {
            Some(sort) => {
                let sort = self.filter(sort);
                format!("({partition}) AND ({sort})")
            }
            None => partition,
        }
    }

    /// Consumes the builder, returning the name and value bindings.
    #[must_use]
    pub fn into_bindings(self) -> (BTreeMap<String, String>, BTreeMap<String, AttributeValue>) {
        let names = self
            .names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (format!("#{i}"), name))
            .collect();
        let values = self
            .values
            .into_iter()
            .enumerate()
            .map(|(i, value)| (format!(":{i}"), value))
            .collect();
        (names, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ir::ComparisonOp;

    fn eq(name: NamePath, value: &str) -> Predicate {
        Predicate::Compare {
            left: IrOperand::Name(name),
            op: ComparisonOp::Eq,
            right: IrOperand::Value(AttributeValue::string(value)),
        }
    }

    #[test]
    fn test_should_share_names_but_not_values() {
        let mut builder = ExpressionBuilder::new();
        let filter = builder.filter(&Predicate::And(vec![
            eq(NamePath::root("pk"), "prefix"),
            eq(NamePath::root("pk"), "prefix"),
        ]));
        assert_eq!(filter, "(#0 = :0) AND (#0 = :1)");

        let (names, values) = builder.into_bindings();
        assert_eq!(names.len(), 1);
        assert_eq!(names["#0"], "pk");
        assert_eq!(values.len(), 2);
        assert_eq!(values[":1"], AttributeValue::string("prefix"));
    }

    #[test]
    fn test_should_fold_leading_keys_into_one_name() {
        let path = NamePath {
            root: "this".to_owned(),
            segments: vec![
                PathSegment::Key("that".to_owned()),
                PathSegment::Key("value".to_owned()),
            ],
        };
        let mut builder = ExpressionBuilder::new();
        assert_eq!(builder.filter(&eq(path, "else")), "#0 = :0");
        assert_eq!(builder.into_bindings().0["#0"], "this.that.value");
    }

    #[test]
    fn test_should_render_subscripts_after_the_name() {
        let path = NamePath {
            root: "this".to_owned(),
            segments: vec![
                PathSegment::Index(2),
                PathSegment::Index(3),
                PathSegment::Key("x".to_owned()),
            ],
        };
        let mut builder = ExpressionBuilder::new();
        assert_eq!(builder.filter(&eq(path, "v")), "#0[2][3].#1 = :0");
        let (names, _) = builder.into_bindings();
        assert_eq!(names["#1"], "x");
    }

    #[test]
    fn test_should_render_key_conditions_partition_first() {
        let sort = Predicate::BeginsWith {
            name: NamePath::root("sk"),
            prefix: AttributeValue::string("another"),
        };
        let mut builder = ExpressionBuilder::new();
        let condition = builder.key_condition(&eq(NamePath::root("pk"), "prefix"), Some(&sort));
        assert_eq!(condition, "(#0 = :0) AND (begins_with (#1, :1))");
    }
}
