//! Tagged-union value tree.
//!
//! A [`MappingNode`] is either a scalar, an ordered list of nodes or a map of
//! named nodes. Absent or not-yet-resolved values are represented with
//! `Option<MappingNode>::None` by the types that hold them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    Str(String),
}

/// A node in a tree-shaped value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingNode {
    /// A scalar leaf.
    Scalar(ScalarValue),
    /// An ordered list of nodes.
    Items(Vec<MappingNode>),
    /// A map of named nodes, kept in key order.
    Fields(BTreeMap<String, MappingNode>),
}

impl ScalarValue {
    const fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::Str(_) => 2,
        }
    }

    /// Total ordering used to canonicalize arrays.
    ///
    /// Booleans sort before numbers, numbers before strings. Integers and
    /// floats compare numerically with each other.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl MappingNode {
    /// Builds a map node from name/value pairs.
    #[must_use]
    pub fn fields<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Fields(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a list node.
    #[must_use]
    pub fn items(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Items(items.into_iter().collect())
    }

    /// Short name of the node's shape, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Items(_) => "array",
            Self::Fields(_) => "object",
        }
    }

    /// Returns the scalar value, if this is a scalar.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Self]> {
        match self {
            Self::Items(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the named fields, if this is a map.
    #[must_use]
    pub const fn as_fields(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a direct child field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Self> {
        self.as_fields().and_then(|fields| fields.get(name))
    }

    /// Returns the string value, if this is a string scalar.
    #[must_use]
    pub const fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(ScalarValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for MappingNode {
    fn from(value: bool) -> Self {
        Self::Scalar(ScalarValue::Bool(value))
    }
}

impl From<i64> for MappingNode {
    fn from(value: i64) -> Self {
        Self::Scalar(ScalarValue::Int(value))
    }
}

impl From<f64> for MappingNode {
    fn from(value: f64) -> Self {
        Self::Scalar(ScalarValue::Float(value))
    }
}

impl From<&str> for MappingNode {
    fn from(value: &str) -> Self {
        Self::Scalar(ScalarValue::Str(value.to_string()))
    }
}

impl From<String> for MappingNode {
    fn from(value: String) -> Self {
        Self::Scalar(ScalarValue::Str(value))
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl std::fmt::Display for MappingNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "{value}"),
            Self::Items(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Fields(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
