//! Builtin functions callable from expressions.
//!
//! `size` and `range` are part of the query language. Names starting with `_x_`
//! are scripting helpers; they resolve only while
//! [`QueryExprConfig::private_builtins`] is set.

use std::fmt;

use bigdecimal::ToPrimitive;
use chrono::{DateTime, Utc};
use ddbrowse_model::AttributeValue;

use crate::config::QueryExprConfig;
use crate::error::{QueryExprError, Result};

/// Clock read by `_x_now()`.
pub trait TimeSource: fmt::Debug + Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Everything a builtin may read besides its arguments.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinContext<'a> {
    /// Clock for `_x_now()`.
    pub time_source: &'a dyn TimeSource,
    /// Engine configuration.
    pub config: &'a QueryExprConfig,
}

/// The builtin functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `size(v)`: length of a string or binary, cardinality of a collection.
    Size,
    /// `range(from, to)`: inclusive list of integers.
    Range,
    /// `_x_now()`: current unix time in seconds.
    Now,
    /// `_x_add(a, b)`: exact sum of two numbers.
    Add,
    /// `_x_concat(...)`: concatenated string forms.
    Concat,
}

impl Builtin {
    /// Resolves a function name, honouring the private builtin switch.
    #[must_use]
    pub fn lookup(name: &str, config: &QueryExprConfig) -> Option<Self> {
        let builtin = match name {
            "size" => Self::Size,
            "range" => Self::Range,
            "_x_now" => Self::Now,
            "_x_add" => Self::Add,
            "_x_concat" => Self::Concat,
            _ => return None,
        };
        (!builtin.is_private() || config.private_builtins).then_some(builtin)
    }

    /// The name the function is called by.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Range => "range",
            Self::Now => "_x_now",
            Self::Add => "_x_add",
            Self::Concat => "_x_concat",
        }
    }

    /// Returns `true` for the scripting helpers.
    #[must_use]
    pub fn is_private(self) -> bool {
        matches!(self, Self::Now | Self::Add | Self::Concat)
    }

    /// Calls the builtin. Absent arguments are `None`.
    pub fn call(
        self,
        args: &[Option<AttributeValue>],
        ctx: &BuiltinContext<'_>,
    ) -> Result<AttributeValue> {
        match self {
            Self::Size => {
                self.expect_args(args, 1)?;
                let len = args[0]
                    .as_ref()
                    .and_then(AttributeValue::cardinality)
                    .ok_or_else(|| self.invalid_type(0, "S, B, L, M, SS, NS or BS"))?;
                Ok(AttributeValue::N(len.to_string()))
            }
            Self::Range => {
                self.expect_args(args, 2)?;
                let from = self.integer_arg(args, 0)?;
                let to = self.integer_arg(args, 1)?;
                let len = if to < from {
                    0
                } else {
                    (i128::from(to) - i128::from(from) + 1).unsigned_abs()
                };
                if len > ctx.config.max_range_values as u128 {
                    return Err(QueryExprError::RangeTooLarge {
                        len,
                        max: ctx.config.max_range_values,
                    });
                }
                let values = (from..=to).map(|n| AttributeValue::N(n.to_string()));
                Ok(AttributeValue::L(values.collect()))
            }
            Self::Now => {
                self.expect_args(args, 0)?;
                let now = ctx.time_source.now().timestamp();
                Ok(AttributeValue::N(now.to_string()))
            }
            Self::Add => {
                self.expect_args(args, 2)?;
                let a = self.decimal_arg(args, 0)?;
                let b = self.decimal_arg(args, 1)?;
                Ok(AttributeValue::from_decimal(&(a + b)))
            }
            Self::Concat => {
                let mut out = String::new();
                for (i, arg) in args.iter().enumerate() {
                    let s = arg
                        .as_ref()
                        .and_then(AttributeValue::string_form)
                        .ok_or_else(|| self.invalid_type(i, "S, N or BOOL"))?;
                    out.push_str(&s);
                }
                Ok(AttributeValue::S(out))
            }
        }
    }

    fn expect_args(self, args: &[Option<AttributeValue>], expected: usize) -> Result<()> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(QueryExprError::InvalidArgumentNumber {
                name: self.name().to_owned(),
                expected,
                actual: args.len(),
            })
        }
    }

    fn invalid_type(self, arg_index: usize, expected: &str) -> QueryExprError {
        QueryExprError::InvalidArgumentType {
            name: self.name().to_owned(),
            arg_index,
            expected: expected.to_owned(),
        }
    }

    fn decimal_arg(self, args: &[Option<AttributeValue>], i: usize) -> Result<bigdecimal::BigDecimal> {
        args[i]
            .as_ref()
            .and_then(AttributeValue::as_decimal)
            .ok_or_else(|| self.invalid_type(i, "N"))
    }

    fn integer_arg(self, args: &[Option<AttributeValue>], i: usize) -> Result<i64> {
        self.decimal_arg(args, i)
            .ok()
            .filter(bigdecimal::BigDecimal::is_integer)
            .and_then(|d| d.to_i64())
            .ok_or_else(|| self.invalid_type(i, "N (integer)"))
    }
}
