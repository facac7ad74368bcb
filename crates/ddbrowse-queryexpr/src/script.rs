//! Bridge between script host values and attribute values.
//!
//! Scripts see records through [`ItemProxy`], addressing attributes with
//! query expression paths such as `address.lines[0]`.

use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, ToPrimitive};
use bytes::Bytes;
use ddbrowse_model::attribute_value::{format_number, parse_number};
use ddbrowse_model::{AttributeValue, ResultSet};

use crate::error::{QueryExprError, Result};
use crate::query_expr::QueryExpr;

/// A value as seen by the script host.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// No value.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Exact decimal.
    Decimal(BigDecimal),
    /// String.
    Str(String),
    /// Binary.
    Bytes(Bytes),
    /// Ordered list.
    List(Vec<ScriptValue>),
    /// String-keyed map.
    Map(BTreeMap<String, ScriptValue>),
    /// Unordered set.
    Set(Vec<ScriptValue>),
}

impl ScriptValue {
    /// Converts to an attribute value.
    ///
    /// Sets become number sets when every member is numeric, binary sets when
    /// every member is binary, and string sets otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ValueNotConvertableToString` if a member of a mixed set has no
    /// string form.
    pub fn to_attribute_value(&self) -> Result<AttributeValue> {
        Ok(match self {
            Self::Nil => AttributeValue::Null(true),
            Self::Bool(b) => AttributeValue::Bool(*b),
            Self::Int(i) => AttributeValue::N(i.to_string()),
            Self::Decimal(d) => AttributeValue::from_decimal(d),
            Self::Str(s) => AttributeValue::S(s.clone()),
            Self::Bytes(b) => AttributeValue::B(b.clone()),
            Self::List(items) => AttributeValue::L(
                items
                    .iter()
                    .map(Self::to_attribute_value)
                    .collect::<Result<_>>()?,
            ),
            Self::Map(entries) => AttributeValue::M(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_attribute_value()?)))
                    .collect::<Result<_>>()?,
            ),
            Self::Set(members) => set_value(members)?,
        })
    }

    /// Converts from an attribute value. Integral numbers that fit an `i64`
    /// become [`ScriptValue::Int`].
    #[must_use]
    pub fn from_attribute_value(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::S(s) => Self::Str(s.clone()),
            AttributeValue::N(n) => number(n),
            AttributeValue::B(b) => Self::Bytes(b.clone()),
            AttributeValue::Bool(b) => Self::Bool(*b),
            AttributeValue::Null(_) => Self::Nil,
            AttributeValue::L(items) => Self::List(items.iter().map(Self::from_attribute_value).collect()),
            AttributeValue::M(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_attribute_value(v)))
                    .collect(),
            ),
            AttributeValue::Ss(set) => Self::Set(set.iter().cloned().map(Self::Str).collect()),
            AttributeValue::Ns(set) => Self::Set(set.iter().map(|n| number(n)).collect()),
            AttributeValue::Bs(set) => Self::Set(set.iter().cloned().map(Self::Bytes).collect()),
        }
    }

    fn string_form(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Decimal(d) => Some(format_number(d)),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn number(text: &str) -> ScriptValue {
    match parse_number(text) {
        Some(d) if d.is_integer() => d
            .to_i64()
            .map_or(ScriptValue::Decimal(d), ScriptValue::Int),
        Some(d) => ScriptValue::Decimal(d),
        None => ScriptValue::Str(text.to_owned()),
    }
}

fn set_value(members: &[ScriptValue]) -> Result<AttributeValue> {
    if members.is_empty() {
        return Ok(AttributeValue::Ss(Vec::new()));
    }
    let numeric = members
        .iter()
        .all(|m| matches!(m, ScriptValue::Int(_) | ScriptValue::Decimal(_)));
    if numeric {
        let numbers = members.iter().filter_map(ScriptValue::string_form).collect();
        return Ok(AttributeValue::Ns(numbers));
    }
    if members.iter().all(|m| matches!(m, ScriptValue::Bytes(_))) {
        let binaries = members
            .iter()
            .filter_map(|m| match m {
                ScriptValue::Bytes(b) => Some(b.clone()),
                _ => None,
            })
            .collect();
        return Ok(AttributeValue::Bs(binaries));
    }
    let strings = members
        .iter()
        .map(|m| {
            m.string_form()
                .ok_or_else(|| QueryExprError::ValueNotConvertableToString {
                    value: format!("{m:?}"),
                })
        })
        .collect::<Result<_>>()?;
    Ok(AttributeValue::Ss(strings))
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ScriptValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<BigDecimal> for ScriptValue {
    fn from(d: BigDecimal) -> Self {
        Self::Decimal(d)
    }
}

impl<T: Into<ScriptValue>> From<Vec<T>> for ScriptValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Script access to one record of a result set.
#[derive(Debug)]
pub struct ItemProxy<'a> {
    result_set: &'a mut ResultSet,
    index: usize,
}

impl<'a> ItemProxy<'a> {
    /// A proxy for record `index`, or `None` if there is no such record.
    pub fn new(result_set: &'a mut ResultSet, index: usize) -> Option<Self> {
        (index < result_set.len()).then_some(Self { result_set, index })
    }

    /// The record's position in the result set.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` if the record has unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.result_set.is_dirty(self.index)
    }

    /// Reads the attribute at `path`.
    ///
    /// # Errors
    ///
    /// Returns `QueryExprError` if `path` does not parse or cannot be evaluated.
    pub fn attr(&self, path: &str) -> Result<Option<ScriptValue>> {
        let item = self
            .result_set
            .item(self.index)
            .ok_or(QueryExprError::NoSuchItem { index: self.index })?;
        let value = QueryExpr::parse(path)?.eval_item(item)?;
        Ok(value.as_ref().map(ScriptValue::from_attribute_value))
    }

    /// Writes the attribute at `path` and marks the record dirty.
    ///
    /// # Errors
    ///
    /// Returns `QueryExprError` if `path` is not a settable path or the value
    /// cannot be converted.
    pub fn set_attr(&mut self, path: &str, value: impl Into<ScriptValue>) -> Result<()> {
        let value = value.into().to_attribute_value()?;
        QueryExpr::parse(path)?.set_eval_item_in(self.result_set, self.index, value)
    }

    /// Removes the attribute at `path` and marks the record dirty.
    ///
    /// # Errors
    ///
    /// Returns `QueryExprError` if `path` is not a settable path.
    pub fn delete_attr(&mut self, path: &str) -> Result<()> {
        QueryExpr::parse(path)?.delete_attribute_in(self.result_set, self.index)
    }
}
