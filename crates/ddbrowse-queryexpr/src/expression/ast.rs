//! AST types for query expressions.
//!
//! The tree keeps every parenthesis written in the source, so printing it with
//! [`fmt::Display`] yields canonical text that parses back into the same tree.

use std::fmt;

/// A parsed query: the expression and its optional `using` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAst {
    /// The root expression.
    pub expr: Expr,
    /// Options from the trailing `using` clause.
    pub options: Vec<QueryOption>,
}

/// An option of the `using` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOption {
    /// `using scan`: never plan a keyed query.
    Scan,
    /// `using index("name")`: query the named secondary index.
    Index(String),
}

/// Expression AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `a or b or ...`, at least two operands.
    Or(Vec<Expr>),
    /// `a and b and ...`, at least two operands.
    And(Vec<Expr>),
    /// `not a`.
    Not(Box<Expr>),
    /// `a in (b, c)`, `a not in (b)` or `a in b`.
    In {
        /// The value looked up.
        operand: Box<Expr>,
        /// `not in`.
        negated: bool,
        /// Where the value is looked up.
        candidates: InCandidates,
    },
    /// Binary comparison: `left op right`.
    Compare {
        /// Left-hand operand.
        left: Box<Expr>,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand operand.
        right: Box<Expr>,
    },
    /// Type or existence check: `a is "S"`, `a is not "any"`.
    Is {
        /// The value checked.
        operand: Box<Expr>,
        /// `is not`.
        negated: bool,
        /// Expression producing the type name.
        type_name: Box<Expr>,
    },
    /// Inclusive range check: `a between low and high`.
    Between {
        /// The value checked.
        operand: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
    },
    /// Map field access: `base.field`.
    Dot {
        /// The map expression.
        base: Box<Expr>,
        /// The field name.
        field: String,
    },
    /// Subscript: `base[index]`.
    Index {
        /// The list or map expression.
        base: Box<Expr>,
        /// Expression producing an integer index or a string key.
        index: Box<Expr>,
    },
    /// Function call: `function(args...)`.
    Call {
        /// The callee, a bare name for every builtin.
        function: Box<Expr>,
        /// Call arguments.
        args: Vec<Expr>,
    },
    /// Attribute reference.
    Name(String),
    /// Literal value.
    Literal(Literal),
    /// `$value` or `:name` placeholder.
    Placeholder(Placeholder),
    /// Parenthesized expression.
    Paren(Box<Expr>),
}

/// The right side of `in`.
#[derive(Debug, Clone, PartialEq)]
pub enum InCandidates {
    /// A parenthesized list of candidates.
    List(Vec<Expr>),
    /// A single collection, string or `range()` call.
    Single(Box<Expr>),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `^=`, begins with.
    BeginsWith,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::BeginsWith => "^=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// String literal, unescaped.
    String(String),
    /// Number literal, as written.
    Number(String),
    /// `true` or `false`.
    Bool(bool),
}

/// Placeholder flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `$x`: bound to a value.
    Value,
    /// `:x`: bound to an attribute name.
    Name,
}

/// A placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Which binding map the placeholder reads.
    pub kind: PlaceholderKind,
    /// The name without its prefix.
    pub name: String,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            PlaceholderKind::Value => '$',
            PlaceholderKind::Name => ':',
        };
        write!(f, "{prefix}{}", self.name)
    }
}

impl Expr {
    /// Returns `true` if the expression is an attribute path: a name, a `:name`
    /// placeholder, or a field/subscript chain over one. Only paths can be
    /// written to or deleted.
    #[must_use]
    pub fn is_path(&self) -> bool {
        match self {
            Self::Name(_)
            | Self::Placeholder(Placeholder {
                kind: PlaceholderKind::Name,
                ..
            }) => true,
            Self::Paren(inner) => inner.is_path(),
            Self::Dot { base, .. } | Self::Index { base, .. } => base.is_path(),
            _ => false,
        }
    }

    /// The name referenced by a bare identifier, looking through parentheses.
    #[must_use]
    pub fn bare_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Paren(inner) => inner.bare_name(),
            _ => None,
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Writes `s` as a double-quoted string literal.
pub(crate) fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write_quoted(f, s),
            Self::Number(n) => f.write_str(n),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Or(operands) => write_joined(f, operands, " or "),
            Self::And(operands) => write_joined(f, operands, " and "),
            Self::Not(inner) => write!(f, "not {inner}"),
            Self::In {
                operand,
                negated,
                candidates,
            } => {
                write!(f, "{operand} ")?;
                if *negated {
                    f.write_str("not ")?;
                }
                f.write_str("in ")?;
                match candidates {
                    InCandidates::List(list) => {
                        f.write_str("(")?;
                        write_joined(f, list, ", ")?;
                        f.write_str(")")
                    }
                    InCandidates::Single(single) => write!(f, "{single}"),
                }
            }
            Self::Compare { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::Is {
                operand,
                negated,
                type_name,
            } => {
                if *negated {
                    write!(f, "{operand} is not {type_name}")
                } else {
                    write!(f, "{operand} is {type_name}")
                }
            }
            Self::Between { operand, low, high } => {
                write!(f, "{operand} between {low} and {high}")
            }
            Self::Dot { base, field } => write!(f, "{base}.{field}"),
            Self::Index { base, index } => write!(f, "{base}[{index}]"),
            Self::Call { function, args } => {
                write!(f, "{function}(")?;
                write_joined(f, args, ", ")?;
                f.write_str(")")
            }
            Self::Name(name) => f.write_str(name),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Placeholder(ph) => write!(f, "{ph}"),
            Self::Paren(inner) => write!(f, "({inner})"),
        }
    }
}

impl fmt::Display for QueryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => f.write_str("scan"),
            Self::Index(name) => {
                f.write_str("index(")?;
                write_quoted(f, name)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for QueryAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        for (i, option) in self.options.iter().enumerate() {
            f.write_str(if i == 0 { " using " } else { ", " })?;
            write!(f, "{option}")?;
        }
        Ok(())
    }
}
