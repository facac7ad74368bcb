//! DynamoDB `AttributeValue` and the value helpers shared by the query engine.
//!
//! Values serialize to DynamoDB JSON, a single-key object such as `{"S": "hello"}`.
//! Numbers are kept as their decimal text and are only ever interpreted through
//! [`BigDecimal`], so arbitrarily long numbers compare exactly.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bigdecimal::{BigDecimal, Zero};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Type codes accepted by `is` checks and `attribute_type` filters.
pub const TYPE_CODES: &[&str] = &["S", "N", "B", "BOOL", "NULL", "L", "M", "SS", "NS", "BS"];

/// DynamoDB attribute value.
///
/// Exactly one variant is present. Numbers are string-encoded to preserve
/// arbitrary precision.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value, as decimal text.
    N(String),
    /// Binary value (base64-encoded in JSON).
    B(bytes::Bytes),
    /// String set.
    Ss(Vec<String>),
    /// Number set, as decimal text.
    Ns(Vec<String>),
    /// Binary set.
    Bs(Vec<bytes::Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null value.
    Null(bool),
    /// List of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute values.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Builds a string value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    /// Builds a number value from its decimal text.
    #[must_use]
    pub fn number(value: impl Into<String>) -> Self {
        Self::N(value.into())
    }

    /// Builds a number value from an exact decimal.
    #[must_use]
    pub fn from_decimal(value: &BigDecimal) -> Self {
        Self::N(format_number(value))
    }

    /// Returns `true` if this is a string value.
    #[must_use]
    pub fn is_s(&self) -> bool {
        matches!(self, Self::S(_))
    }

    /// Returns `true` if this is a number value.
    #[must_use]
    pub fn is_n(&self) -> bool {
        matches!(self, Self::N(_))
    }

    /// Returns `true` if this is a null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Returns the string value if this is an `S` variant.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number text if this is an `N` variant.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the map if this is an `M` variant.
    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the list if this is an `L` variant.
    #[must_use]
    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool` variant.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the exact decimal of an `N` value.
    ///
    /// `None` for other variants and for number text that does not parse.
    #[must_use]
    pub fn as_decimal(&self) -> Option<BigDecimal> {
        self.as_n().and_then(parse_number)
    }

    /// Returns the DynamoDB type descriptor string (e.g., "S", "N", "BOOL").
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// The string form of a scalar: `S` as is, `N` as its text, `BOOL` as
    /// `true`/`false`. Other kinds have no string form.
    #[must_use]
    pub fn string_form(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::S(s) | Self::N(s) => Some(Cow::Borrowed(s)),
            Self::Bool(true) => Some(Cow::Borrowed("true")),
            Self::Bool(false) => Some(Cow::Borrowed("false")),
            _ => None,
        }
    }

    /// Coerces the value to a boolean for logical operators.
    ///
    /// Null is false, a bool is itself, a string is true when non-empty and a
    /// number is true when non-zero. Everything else is true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null(_) => false,
            Self::Bool(b) => *b,
            Self::S(s) => !s.is_empty(),
            Self::N(n) => parse_number(n).is_none_or(|d| !d.is_zero()),
            _ => true,
        }
    }

    /// Orders two scalars of the same kind.
    ///
    /// Strings and binaries compare bytewise, numbers compare as exact
    /// decimals and `false` sorts before `true`. Returns `None` when the kinds
    /// differ, when either side is not a scalar, or when a number does not parse.
    #[must_use]
    pub fn compare_scalar(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::S(a), Self::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Self::N(a), Self::N(b)) => Some(parse_number(a)?.cmp(&parse_number(b)?)),
            (Self::B(a), Self::B(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Number of characters, bytes or elements, as reported by `size()`.
    ///
    /// `None` for numbers, booleans and nulls.
    #[must_use]
    pub fn cardinality(&self) -> Option<usize> {
        match self {
            Self::S(s) => Some(s.len()),
            Self::B(b) => Some(b.len()),
            Self::Ss(v) | Self::Ns(v) => Some(v.len()),
            Self::Bs(v) => Some(v.len()),
            Self::L(v) => Some(v.len()),
            Self::M(m) => Some(m.len()),
            Self::N(_) | Self::Bool(_) | Self::Null(_) => None,
        }
    }
}

/// Parses DynamoDB number text into an exact decimal.
#[must_use]
pub fn parse_number(text: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(text.trim()).ok()
}

/// Formats an exact decimal as DynamoDB number text.
///
/// Integers are written without a fractional part; other values drop trailing
/// zeros.
#[must_use]
pub fn format_number(value: &BigDecimal) -> String {
    if value.is_integer() {
        value.with_scale(0).to_string()
    } else {
        value.normalized().to_string()
    }
}

impl Eq for AttributeValue {}

impl std::hash::Hash for AttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::S(s) | Self::N(s) => s.hash(state),
            Self::B(b) => b.hash(state),
            Self::Bool(b) | Self::Null(b) => b.hash(state),
            Self::Ss(v) | Self::Ns(v) => v.hash(state),
            Self::Bs(v) => v.iter().for_each(|b| b.hash(state)),
            Self::L(v) => v.hash(state),
            Self::M(m) => {
                let mut pairs: Vec<_> = m.iter().collect();
                pairs.sort_by_key(|(k, _)| *k);
                for (k, v) in pairs {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{s:?}"),
            Self::N(n) => f.write_str(n),
            Self::B(b) => write!(f, "<{} bytes>", b.len()),
            Self::Ss(v) => write!(f, "SS{v:?}"),
            Self::Ns(v) => write!(f, "NS[{}]", v.join(", ")),
            Self::Bs(v) => write!(f, "BS<{} items>", v.len()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null(_) => f.write_str("null"),
            Self::L(v) => {
                f.write_str("[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::M(m) => {
                let mut keys: Vec<_> = m.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {}", m[key])?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let tag = self.type_descriptor();
        match self {
            Self::S(s) | Self::N(s) => map.serialize_entry(tag, s)?,
            Self::B(b) => map.serialize_entry(tag, &BASE64.encode(b))?,
            Self::Ss(v) | Self::Ns(v) => map.serialize_entry(tag, v)?,
            Self::Bs(v) => {
                let encoded: Vec<String> = v.iter().map(|b| BASE64.encode(b)).collect();
                map.serialize_entry(tag, &encoded)?;
            }
            Self::Bool(b) | Self::Null(b) => map.serialize_entry(tag, b)?,
            Self::L(list) => map.serialize_entry(tag, list)?,
            Self::M(m) => map.serialize_entry(tag, m)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

struct AttributeValueVisitor;

fn decode_binary<E: de::Error>(encoded: &str) -> Result<bytes::Bytes, E> {
    BASE64
        .decode(encoded)
        .map(bytes::Bytes::from)
        .map_err(de::Error::custom)
}

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a DynamoDB AttributeValue object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom(
                "AttributeValue must have exactly one key",
            ));
        };

        let value = match key.as_str() {
            "S" => AttributeValue::S(map.next_value()?),
            "N" => AttributeValue::N(map.next_value()?),
            "B" => AttributeValue::B(decode_binary(&map.next_value::<String>()?)?),
            "SS" => AttributeValue::Ss(map.next_value()?),
            "NS" => AttributeValue::Ns(map.next_value()?),
            "BS" => {
                let encoded: Vec<String> = map.next_value()?;
                let decoded = encoded
                    .iter()
                    .map(|e| decode_binary(e))
                    .collect::<Result<Vec<_>, _>>()?;
                AttributeValue::Bs(decoded)
            }
            "BOOL" => AttributeValue::Bool(map.next_value()?),
            "NULL" => AttributeValue::Null(map.next_value()?),
            "L" => AttributeValue::L(map.next_value()?),
            "M" => AttributeValue::M(map.next_value()?),
            other => return Err(de::Error::unknown_field(other, TYPE_CODES)),
        };

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_string_value() {
        let val = AttributeValue::string("hello");
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"S":"hello"}"#);
    }

    #[test]
    fn test_should_serialize_list_value() {
        let val = AttributeValue::L(vec![
            AttributeValue::string("a"),
            AttributeValue::number("1"),
        ]);
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"L":[{"S":"a"},{"N":"1"}]}"#);
    }

    #[test]
    fn test_should_roundtrip_binary_value() {
        let val = AttributeValue::B(bytes::Bytes::from_static(b"test data"));
        let json = serde_json::to_string(&val).unwrap();
        let deserialized: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(val, deserialized);
    }

    #[test]
    fn test_should_deserialize_number_set() {
        let val: AttributeValue = serde_json::from_str(r#"{"NS":["1","2","3"]}"#).unwrap();
        assert!(matches!(val, AttributeValue::Ns(ref v) if v.len() == 3));
    }

    #[test]
    fn test_should_reject_unknown_type_key() {
        let result = serde_json::from_str::<AttributeValue>(r#"{"X":"1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_compare_long_numbers_exactly() {
        let a = AttributeValue::number("123456789012345678901234567890");
        let b = AttributeValue::number("123456789012345678901234567891");
        assert_eq!(a.compare_scalar(&a.clone()), Some(Ordering::Equal));
        assert_eq!(a.compare_scalar(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_should_compare_numbers_numerically() {
        let a = AttributeValue::number("10");
        let b = AttributeValue::number("9.5");
        assert_eq!(a.compare_scalar(&b), Some(Ordering::Greater));
        assert_eq!(
            AttributeValue::number("1.50").compare_scalar(&AttributeValue::number("1.5")),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_should_not_compare_mixed_kinds() {
        let s = AttributeValue::string("abc");
        let n = AttributeValue::number("123");
        assert_eq!(s.compare_scalar(&n), None);
        assert_eq!(AttributeValue::Null(true).compare_scalar(&AttributeValue::Null(true)), None);
    }

    #[test]
    fn test_should_order_false_before_true() {
        assert_eq!(
            AttributeValue::Bool(false).compare_scalar(&AttributeValue::Bool(true)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_should_coerce_truthiness() {
        assert!(!AttributeValue::Null(true).is_truthy());
        assert!(!AttributeValue::string("").is_truthy());
        assert!(AttributeValue::string("x").is_truthy());
        assert!(!AttributeValue::number("0").is_truthy());
        assert!(!AttributeValue::number("0.00").is_truthy());
        assert!(AttributeValue::number("5").is_truthy());
        assert!(AttributeValue::L(vec![]).is_truthy());
        assert!(!AttributeValue::Bool(false).is_truthy());
    }

    #[test]
    fn test_should_produce_string_form_of_scalars() {
        assert_eq!(AttributeValue::number("12").string_form().as_deref(), Some("12"));
        assert_eq!(AttributeValue::Bool(true).string_form().as_deref(), Some("true"));
        assert!(AttributeValue::L(vec![]).string_form().is_none());
    }

    #[test]
    fn test_should_format_decimals() {
        assert_eq!(format_number(&parse_number("3.0").unwrap()), "3");
        assert_eq!(format_number(&parse_number("2.50").unwrap()), "2.5");
        assert_eq!(format_number(&parse_number("-131").unwrap()), "-131");
    }

    #[test]
    fn test_should_display_nested_values() {
        let mut m = HashMap::new();
        m.insert("b".to_owned(), AttributeValue::number("2"));
        m.insert("a".to_owned(), AttributeValue::string("x"));
        let val = AttributeValue::L(vec![AttributeValue::M(m), AttributeValue::Bool(true)]);
        assert_eq!(val.to_string(), r#"[{a: "x", b: 2}, true]"#);
    }
}
