//! Field values exposed by stored records.
//!
//! A [`FieldValue`] is what a [`Record`](crate::store::Record) hands back for a
//! named field, and what [`KeyedStore::find_key_by_field`](crate::store::KeyedStore::find_key_by_field)
//! compares against.

use serde::{Deserialize, Serialize};

/// A single field value read from a record.
///
/// Equality is native per variant: an `Int(1)` never equals a `UInt(1)` or a
/// `Float(1.0)`.
///
/// # Examples
///
/// ```
/// use botloop::FieldValue;
///
/// let id = FieldValue::from(42_i64);
/// let name = FieldValue::from("alice");
///
/// assert!(id.is_int());
/// assert_eq!(name.as_str(), Some("alice"));
/// assert_ne!(FieldValue::Int(1), FieldValue::UInt(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Absent value, e.g. an empty `Option` field.
    Null,
}

impl FieldValue {
    /// Returns true for `Bool`.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Returns true for `Int`.
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Returns true for `String`.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the signed integer, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Null => "null",
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_equality() {
        assert_eq!(FieldValue::from("x"), FieldValue::String("x".to_string()));
        assert_eq!(FieldValue::from(7_i32), FieldValue::Int(7));
        assert_ne!(FieldValue::Int(7), FieldValue::UInt(7));
        assert_ne!(FieldValue::Int(1), FieldValue::Float(1.0));
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<i64> = None;
        assert!(FieldValue::from(none).is_null());
        assert_eq!(FieldValue::from(Some("a")), FieldValue::String("a".to_string()));
    }

    #[test]
    fn test_display_and_type_name() {
        assert_eq!(FieldValue::from("hi").to_string(), "\"hi\"");
        assert_eq!(FieldValue::Null.to_string(), "null");
        assert_eq!(FieldValue::UInt(3).type_name(), "uint");
        assert_eq!(FieldValue::default(), FieldValue::Null);
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_string(&FieldValue::Int(5)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":5}"#);
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FieldValue::Int(5));
    }
}
