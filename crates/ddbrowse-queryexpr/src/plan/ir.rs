//! Intermediate representation between the AST and execution plans.
//!
//! [`IrCompiler`] lowers an expression into [`IrNode`]s: attribute name paths,
//! concrete values, and predicates the planner can turn into key conditions or
//! scan filters. Placeholders are substituted and value-only builtins are
//! folded during lowering, so the IR carries no unresolved references.

use std::fmt;

use ddbrowse_model::attribute_value::TYPE_CODES;
use ddbrowse_model::{AttributeValue, Item, TableInfo};

use crate::error::{QueryExprError, Result};
use crate::expression::ast::{CompareOp, Expr, InCandidates, Placeholder, PlaceholderKind};
use crate::expression::builtins::Builtin;
use crate::expression::evaluator::{EvalContext, literal_value};
use crate::expression::value::PathSegment;

// ---------------------------------------------------------------------------
// IR types
// ---------------------------------------------------------------------------

/// An attribute reference: a top-level name plus nested steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePath {
    /// The top-level attribute name.
    pub root: String,
    /// Steps below the top-level attribute.
    pub segments: Vec<PathSegment>,
}

impl NamePath {
    /// A path to a top-level attribute.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            root: name.into(),
            segments: Vec::new(),
        }
    }

    fn child(mut self, segment: PathSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// The attribute name if this path can be a table key. Nested paths cannot.
    #[must_use]
    pub fn key_name(&self) -> Option<&str> {
        self.segments.is_empty().then_some(self.root.as_str())
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// A side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum IrOperand {
    /// An attribute.
    Name(NamePath),
    /// A concrete value.
    Value(AttributeValue),
    /// `size(name)`.
    Size(NamePath),
}

/// Comparison operators of conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl ComparisonOp {
    /// The operator as written in condition expressions.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A condition the planner can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Any operand holds.
    Or(Vec<Predicate>),
    /// Every operand holds.
    And(Vec<Predicate>),
    /// The operand does not hold.
    Not(Box<Predicate>),
    /// `left op right`.
    Compare {
        /// Left operand.
        left: IrOperand,
        /// Operator.
        op: ComparisonOp,
        /// Right operand.
        right: IrOperand,
    },
    /// The attribute is a string starting with `prefix`.
    BeginsWith {
        /// The attribute.
        name: NamePath,
        /// The prefix, always a string.
        prefix: AttributeValue,
    },
    /// `low <= name <= high`.
    Between {
        /// The attribute.
        name: NamePath,
        /// Lower bound.
        low: IrOperand,
        /// Upper bound.
        high: IrOperand,
    },
    /// The attribute equals one of `values`.
    In {
        /// The attribute.
        name: NamePath,
        /// Candidates.
        values: Vec<IrOperand>,
    },
    /// The attribute contains `needle`.
    Contains {
        /// The attribute.
        name: NamePath,
        /// The value looked for.
        needle: AttributeValue,
    },
    /// The attribute exists, or does not when `negated`.
    Exists {
        /// The attribute.
        name: NamePath,
        /// `attribute_not_exists`.
        negated: bool,
    },
    /// The attribute has the given type code.
    AttributeType {
        /// The attribute.
        name: NamePath,
        /// One of the DynamoDB type codes.
        type_code: String,
    },
}

/// A lowered expression.
#[derive(Debug, Clone, PartialEq)]
pub enum IrNode {
    /// An attribute reference.
    Name(NamePath),
    /// A concrete value.
    Value(AttributeValue),
    /// A list of values produced by `range()`.
    ValueList(Vec<AttributeValue>),
    /// `size(name)`.
    Size(NamePath),
    /// A condition.
    Predicate(Predicate),
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Lowers expressions into IR for a given table.
#[derive(Debug, Clone, Copy)]
pub struct IrCompiler<'a> {
    ctx: EvalContext<'a>,
    table: &'a TableInfo,
}

impl<'a> IrCompiler<'a> {
    /// Creates a compiler resolving placeholders through `ctx`.
    #[must_use]
    pub fn new(ctx: EvalContext<'a>, table: &'a TableInfo) -> Self {
        Self { ctx, table }
    }

    /// Lowers an expression.
    ///
    /// # Errors
    ///
    /// Returns `QueryExprError` when the expression uses a construct that has
    /// no condition equivalent, such as a comparison between two predicates.
    pub fn compile(&self, expr: &Expr) -> Result<IrNode> {
        match expr {
            Expr::Name(name) => Ok(IrNode::Name(NamePath::root(name.clone()))),
            Expr::Placeholder(placeholder) => self.compile_placeholder(placeholder),
            Expr::Literal(literal) => Ok(IrNode::Value(literal_value(literal))),
            Expr::Paren(inner) => self.compile(inner),
            Expr::Dot { base, field } => {
                let path = self.name(base)?;
                Ok(IrNode::Name(path.child(PathSegment::Key(field.clone()))))
            }
            Expr::Index { base, index } => {
                let path = self.name(base)?;
                let segment = self.ctx.subref(index, &Item::new())?;
                Ok(IrNode::Name(path.child(segment)))
            }
            Expr::Or(operands) => Ok(IrNode::Predicate(Predicate::Or(self.predicates(operands)?))),
            Expr::And(operands) => Ok(IrNode::Predicate(Predicate::And(self.predicates(operands)?))),
            Expr::Not(inner) => Ok(IrNode::Predicate(Predicate::Not(Box::new(
                self.predicate(inner)?,
            )))),
            Expr::Compare { left, op, right } => self.compile_compare(left, *op, right),
            Expr::Is {
                operand,
                negated,
                type_name,
            } => self.compile_is(operand, *negated, type_name),
            Expr::Between { operand, low, high } => Ok(IrNode::Predicate(Predicate::Between {
                name: self.name(operand)?,
                low: self.operand(low)?,
                high: self.operand(high)?,
            })),
            Expr::In {
                operand,
                negated,
                candidates,
            } => {
                let predicate = match candidates {
                    InCandidates::List(list) => self.compile_in_list(operand, *negated, list)?,
                    InCandidates::Single(haystack) => {
                        self.compile_in_single(operand, *negated, haystack)?
                    }
                };
                Ok(IrNode::Predicate(predicate))
            }
            Expr::Call { function, args } => self.compile_call(function, args),
        }
    }

    fn compile_placeholder(&self, placeholder: &Placeholder) -> Result<IrNode> {
        let missing = || QueryExprError::MissingPlaceholder {
            placeholder: placeholder.to_string(),
        };
        match placeholder.kind {
            PlaceholderKind::Name => {
                let name = self.ctx.names.get(&placeholder.name).ok_or_else(missing)?;
                Ok(IrNode::Name(NamePath::root(name.clone())))
            }
            PlaceholderKind::Value => {
                let value = self.ctx.values.get(&placeholder.name).ok_or_else(missing)?;
                Ok(IrNode::Value(value.clone()))
            }
        }
    }

    fn name(&self, expr: &Expr) -> Result<NamePath> {
        match self.compile(expr)? {
            IrNode::Name(path) => Ok(path),
            _ => Err(QueryExprError::OperandNotAName {
                operand: expr.to_string(),
            }),
        }
    }

    fn value(&self, expr: &Expr) -> Result<AttributeValue> {
        match self.compile(expr)? {
            IrNode::Value(value) => Ok(value),
            _ => Err(QueryExprError::ValueMustBeLiteral {
                operand: expr.to_string(),
            }),
        }
    }

    fn string_value(&self, expr: &Expr) -> Result<String> {
        match self.value(expr)? {
            AttributeValue::S(s) => Ok(s),
            _ => Err(QueryExprError::ValueMustBeString {
                operand: expr.to_string(),
            }),
        }
    }

    fn operand(&self, expr: &Expr) -> Result<IrOperand> {
        match self.compile(expr)? {
            IrNode::Name(path) => Ok(IrOperand::Name(path)),
            IrNode::Value(value) => Ok(IrOperand::Value(value)),
            IrNode::Size(path) => Ok(IrOperand::Size(path)),
            IrNode::ValueList(_) | IrNode::Predicate(_) => Err(QueryExprError::OperandNotAnOperand {
                operand: expr.to_string(),
            }),
        }
    }

    fn predicate(&self, expr: &Expr) -> Result<Predicate> {
        match self.compile(expr)? {
            IrNode::Predicate(predicate) => Ok(predicate),
            _ => Err(QueryExprError::NodeCannotBeConvertedToQuery {
                expr: expr.to_string(),
            }),
        }
    }

    fn predicates(&self, exprs: &[Expr]) -> Result<Vec<Predicate>> {
        exprs.iter().map(|expr| self.predicate(expr)).collect()
    }

    fn compile_compare(&self, left: &Expr, op: CompareOp, right: &Expr) -> Result<IrNode> {
        let op = match op {
            CompareOp::BeginsWith => {
                let name = self.name(left)?;
                let prefix = AttributeValue::S(self.string_value(right)?);
                return Ok(IrNode::Predicate(Predicate::BeginsWith { name, prefix }));
            }
            CompareOp::Eq => ComparisonOp::Eq,
            CompareOp::Ne => ComparisonOp::Ne,
            CompareOp::Lt => ComparisonOp::Lt,
            CompareOp::Le => ComparisonOp::Le,
            CompareOp::Gt => ComparisonOp::Gt,
            CompareOp::Ge => ComparisonOp::Ge,
        };
        Ok(IrNode::Predicate(Predicate::Compare {
            left: self.operand(left)?,
            op,
            right: self.operand(right)?,
        }))
    }

    fn compile_is(&self, operand: &Expr, negated: bool, type_name: &Expr) -> Result<IrNode> {
        let name = self.name(operand)?;
        let type_name = self.string_value(type_name)?;
        let type_code = type_name.to_ascii_uppercase();

        let predicate = if type_code == "ANY" {
            Predicate::Exists { name, negated }
        } else if TYPE_CODES.contains(&type_code.as_str()) {
            negate_if(Predicate::AttributeType { name, type_code }, negated)
        } else {
            return Err(QueryExprError::InvalidTypeForIs { type_name });
        };
        Ok(IrNode::Predicate(predicate))
    }

    fn compile_in_list(&self, operand: &Expr, negated: bool, list: &[Expr]) -> Result<Predicate> {
        let name = self.name(operand)?;
        let values = list
            .iter()
            .map(|candidate| self.operand(candidate))
            .collect::<Result<Vec<_>>>()?;
        self.in_predicate(name, values, negated, || {
            let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
            format!("({})", rendered.join(", "))
        })
    }

    fn compile_in_single(&self, operand: &Expr, negated: bool, haystack: &Expr) -> Result<Predicate> {
        let needle = self.compile(operand)?;
        let haystack_node = self.compile(haystack)?;

        let (name, values) = match (needle, haystack_node) {
            (IrNode::Value(needle), IrNode::Name(name)) => {
                return Ok(negate_if(Predicate::Contains { name, needle }, negated));
            }
            (IrNode::Name(name), IrNode::ValueList(values) | IrNode::Value(AttributeValue::L(values))) => {
                (name, values)
            }
            (IrNode::Name(name), IrNode::Value(other)) => (name, vec![other]),
            (IrNode::Name(_) | IrNode::Value(_), _) => {
                return Err(QueryExprError::OperandNotAnOperand {
                    operand: haystack.to_string(),
                });
            }
            _ => {
                return Err(QueryExprError::OperandNotAnOperand {
                    operand: operand.to_string(),
                });
            }
        };
        let values = values.into_iter().map(IrOperand::Value).collect();
        self.in_predicate(name, values, negated, || haystack.to_string())
    }

    /// A single candidate on a key attribute becomes an equality so the
    /// planner can use it as a key condition. An empty candidate list is
    /// rejected.
    fn in_predicate(
        &self,
        name: NamePath,
        mut values: Vec<IrOperand>,
        negated: bool,
        candidates_text: impl FnOnce() -> String,
    ) -> Result<Predicate> {
        if values.is_empty() {
            return Err(QueryExprError::ValuesNotInnable {
                value: candidates_text(),
            });
        }

        let on_key = name
            .key_name()
            .is_some_and(|key| self.table.is_key_attribute(key));
        if values.len() == 1 && on_key {
            return Ok(Predicate::Compare {
                left: IrOperand::Name(name),
                op: if negated { ComparisonOp::Ne } else { ComparisonOp::Eq },
                right: values.remove(0),
            });
        }
        Ok(negate_if(Predicate::In { name, values }, negated))
    }

    fn compile_call(&self, function: &Expr, args: &[Expr]) -> Result<IrNode> {
        let name = function
            .bare_name()
            .ok_or_else(|| QueryExprError::OperandNotAName {
                operand: function.to_string(),
            })?;
        let builtin = Builtin::lookup(name, self.ctx.config).ok_or_else(|| {
            QueryExprError::UnrecognisedFunction {
                name: name.to_owned(),
            }
        })?;

        if builtin == Builtin::Size {
            let [arg] = args else {
                return Err(QueryExprError::InvalidArgumentNumber {
                    name: name.to_owned(),
                    expected: 1,
                    actual: args.len(),
                });
            };
            return Ok(IrNode::Size(self.name(arg)?));
        }

        let values = args
            .iter()
            .map(|arg| self.value(arg).map(Some))
            .collect::<Result<Vec<_>>>()?;
        let result = builtin.call(&values, &self.ctx.builtin_context())?;
        match (builtin, result) {
            (Builtin::Range, AttributeValue::L(values)) => Ok(IrNode::ValueList(values)),
            (_, value) => Ok(IrNode::Value(value)),
        }
    }
}

fn negate_if(predicate: Predicate, negated: bool) -> Predicate {
    if negated {
        Predicate::Not(Box::new(predicate))
    } else {
        predicate
    }
}
