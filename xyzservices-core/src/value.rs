//! Attribute values stored in a [`TileProvider`](crate::TileProvider).
//!
//! Provider records are schema-less: apart from a few well-known keys, every
//! provider may carry its own parameters. Values are therefore kept in a small
//! closed variant type instead of a fixed struct.

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered attribute map of a single provider.
pub type Attributes = IndexMap<String, Value>;

/// A single attribute value.
///
/// Nested mappings are not representable, which keeps provider records flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// `true` / `false`
    Bool(bool),
    /// Whole numbers such as zoom levels
    Integer(i64),
    /// Floating point numbers
    Float(f64),
    /// Plain text, including URL templates and attributions
    String(String),
    /// Arrays, e.g. the two corners of `bounds`
    List(Vec<Value>),
}

impl Value {
    /// Returns the string content if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the number if this is a [`Value::Integer`].
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric value as a float, accepting both integers and floats.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Integer(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the items if this is a [`Value::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Writes the value the way it appears inside a list, i.e. strings are quoted.
    fn fmt_nested(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => write!(f, "'{v}'"),
            other => other.fmt(f),
        }
    }
}

/// Text used when a value is substituted into a URL template.
///
/// Floats always keep a fractional part (`18.0`), booleans are capitalized,
/// and lists are rendered as `[a, b]` with quoted strings.
impl Display for Value {
    #[allow(clippy::float_cmp)]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}
