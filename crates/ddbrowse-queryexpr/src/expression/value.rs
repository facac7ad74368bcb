//! Values produced by the interpreter.
//!
//! An [`ExprValue`] is either owned (a literal, a placeholder value, the result
//! of a function) or a proxy: an [`ItemPath`] naming a slot inside the item
//! under evaluation. Proxies are resolved lazily against the item, and they are
//! the only values that can be written through.

use std::borrow::Cow;
use std::fmt;

use ddbrowse_model::{AttributeValue, Item};

use crate::error::{QueryExprError, Result};

/// One step of a path below the root attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Map field.
    Key(String),
    /// List element. Negative indices never match.
    Index(i64),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// Location of a value inside an item: a top-level attribute plus nested steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemPath {
    root: String,
    segments: Vec<PathSegment>,
}

impl ItemPath {
    /// A path to a top-level attribute.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            root: name.into(),
            segments: Vec::new(),
        }
    }

    /// The path one step further down.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut path = self.clone();
        path.segments.push(segment);
        path
    }

    /// The top-level attribute name.
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.root
    }

    /// The steps below the root attribute.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The path as text parts: the root followed by every step.
    #[must_use]
    pub fn parts(&self) -> Vec<String> {
        self.parts_upto(self.segments.len())
    }

    fn parts_upto(&self, n: usize) -> Vec<String> {
        std::iter::once(self.root.clone())
            .chain(self.segments[..n].iter().map(ToString::to_string))
            .collect()
    }

    /// Reads the value at this path.
    ///
    /// A missing final step reads as `None`; a missing intermediate step is a
    /// `NameNotFound` error.
    pub fn resolve<'i>(&self, item: &'i Item) -> Result<Option<Cow<'i, AttributeValue>>> {
        let Some(mut current) = item.get(&self.root).map(Cow::Borrowed) else {
            if self.segments.is_empty() {
                return Ok(None);
            }
            return Err(QueryExprError::NameNotFound {
                name: self.root.clone(),
            });
        };

        for (i, segment) in self.segments.iter().enumerate() {
            let next = match current {
                Cow::Borrowed(value) => step(value, segment, || self.parts_upto(i + 1))?,
                Cow::Owned(_) => {
                    // Set elements are scalars.
                    return Err(not_a_container(segment, self.parts_upto(i + 1)));
                }
            };
            match next {
                Some(value) => current = value,
                None if i + 1 == self.segments.len() => return Ok(None),
                None => {
                    return Err(QueryExprError::NameNotFound {
                        name: self.parts_upto(i + 1).join("."),
                    });
                }
            }
        }
        Ok(Some(current))
    }

    /// Mutable access to the container at this path.
    fn resolve_mut<'i>(&self, item: &'i mut Item) -> Result<&'i mut AttributeValue> {
        let mut current = item
            .get_mut(&self.root)
            .ok_or_else(|| QueryExprError::NameNotFound {
                name: self.root.clone(),
            })?;

        for (i, segment) in self.segments.iter().enumerate() {
            let found = match (current, segment) {
                (AttributeValue::M(map), PathSegment::Key(key)) => map.get_mut(key),
                (AttributeValue::L(list), PathSegment::Index(idx)) => {
                    usize::try_from(*idx).ok().and_then(|idx| list.get_mut(idx))
                }
                (_, segment) => return Err(not_a_container(segment, self.parts_upto(i + 1))),
            };
            current = found.ok_or_else(|| QueryExprError::NameNotFound {
                name: self.parts_upto(i + 1).join("."),
            })?;
        }
        Ok(current)
    }

    fn parts_with(&self, last: impl fmt::Display) -> Vec<String> {
        let mut parts = self.parts();
        parts.push(last.to_string());
        parts
    }
}

impl fmt::Display for ItemPath {
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

fn not_a_container(segment: &PathSegment, path: Vec<String>) -> QueryExprError {
    match segment {
        PathSegment::Key(_) => QueryExprError::ValueNotAMap { path },
        PathSegment::Index(_) => QueryExprError::ValueNotAList { path },
    }
}

/// Takes one step into a map, a list or a set.
///
/// `None` means the key or index is absent. Stepping into any other kind is an
/// error naming `path`, the parts walked including this step.
fn step<'v>(
    value: &'v AttributeValue,
    segment: &PathSegment,
    path: impl FnOnce() -> Vec<String>,
) -> Result<Option<Cow<'v, AttributeValue>>> {
    let found = match (value, segment) {
        (AttributeValue::M(map), PathSegment::Key(key)) => map.get(key).map(Cow::Borrowed),
        (AttributeValue::L(list), PathSegment::Index(idx)) => element(list, *idx).map(Cow::Borrowed),
        (AttributeValue::Ss(set), PathSegment::Index(idx)) => {
            element(set, *idx).map(|s| Cow::Owned(AttributeValue::S(s.clone())))
        }
        (AttributeValue::Ns(set), PathSegment::Index(idx)) => {
            element(set, *idx).map(|n| Cow::Owned(AttributeValue::N(n.clone())))
        }
        (AttributeValue::Bs(set), PathSegment::Index(idx)) => {
            element(set, *idx).map(|b| Cow::Owned(AttributeValue::B(b.clone())))
        }
        (_, segment) => return Err(not_a_container(segment, path())),
    };
    Ok(found)
}

fn element<T>(items: &[T], idx: i64) -> Option<&T> {
    usize::try_from(idx).ok().and_then(|idx| items.get(idx))
}

/// A value produced while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    /// Nothing: an absent element of an owned collection.
    Absent,
    /// An independent value with no link to the item.
    Owned(AttributeValue),
    /// A slot inside the item under evaluation.
    Proxy(ItemPath),
}

impl ExprValue {
    /// Returns `true` if writes through this value reach the item.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    /// Reads the value, resolving proxies against `item`.
    pub fn resolve<'a>(&'a self, item: &'a Item) -> Result<Option<Cow<'a, AttributeValue>>> {
        match self {
            Self::Absent => Ok(None),
            Self::Owned(value) => Ok(Some(Cow::Borrowed(value))),
            Self::Proxy(path) => path.resolve(item),
        }
    }

    /// Reads the value into an owned attribute value.
    pub fn into_value(self, item: &Item) -> Result<Option<AttributeValue>> {
        match self {
            Self::Absent => Ok(None),
            Self::Owned(value) => Ok(Some(value)),
            Self::Proxy(path) => Ok(path.resolve(item)?.map(Cow::into_owned)),
        }
    }

    /// The value one step further down.
    ///
    /// Proxies extend their path without touching the item. Owned values are
    /// navigated immediately; `base` names them in errors.
    pub fn child(self, segment: PathSegment, base: &dyn fmt::Display) -> Result<Self> {
        match self {
            Self::Proxy(path) => Ok(Self::Proxy(path.child(segment))),
            Self::Absent => Err(QueryExprError::NameNotFound {
                name: base.to_string(),
            }),
            Self::Owned(value) => {
                let found = step(&value, &segment, || vec![base.to_string(), segment.to_string()])?;
                Ok(found.map_or(Self::Absent, |v| Self::Owned(v.into_owned())))
            }
        }
    }

    fn target(&self) -> Result<&ItemPath> {
        match self {
            Self::Proxy(path) => Ok(path),
            Self::Absent | Self::Owned(_) => Err(QueryExprError::PathNotSettable),
        }
    }

    /// Sets field `key` of the map this value points at.
    pub fn set_value_of(&self, item: &mut Item, key: &str, value: AttributeValue) -> Result<()> {
        let path = self.target()?;
        match path.resolve_mut(item)? {
            AttributeValue::M(map) => {
                map.insert(key.to_owned(), value);
                Ok(())
            }
            _ => Err(QueryExprError::ValueNotAMap {
                path: path.parts_with(key),
            }),
        }
    }

    /// Replaces element `index` of the list this value points at.
    pub fn set_value_at(&self, item: &mut Item, index: i64, value: AttributeValue) -> Result<()> {
        let path = self.target()?;
        match path.resolve_mut(item)? {
            AttributeValue::L(list) => {
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|idx| list.get_mut(idx))
                    .ok_or_else(|| QueryExprError::IndexOutOfRange {
                        path: path.parts(),
                        index,
                    })?;
                *slot = value;
                Ok(())
            }
            _ => Err(QueryExprError::ValueNotAList {
                path: path.parts_with(index),
            }),
        }
    }

    /// Removes field `key` from the map this value points at. Absent keys are ignored.
    pub fn delete_value_of(&self, item: &mut Item, key: &str) -> Result<()> {
        let path = self.target()?;
        match path.resolve_mut(item)? {
            AttributeValue::M(map) => {
                map.remove(key);
                Ok(())
            }
            _ => Err(QueryExprError::ValueNotAMap {
                path: path.parts_with(key),
            }),
        }
    }

    /// Removes element `index` from the list this value points at, shifting
    /// later elements down. Indexes past either end are ignored.
    pub fn delete_value_at(&self, item: &mut Item, index: i64) -> Result<()> {
        let path = self.target()?;
        match path.resolve_mut(item)? {
            AttributeValue::L(list) => {
                if let Some(idx) = usize::try_from(index).ok().filter(|idx| *idx < list.len()) {
                    list.remove(idx);
                }
                Ok(())
            }
            _ => Err(QueryExprError::ValueNotAList {
                path: path.parts_with(index),
            }),
        }
    }
}
