//! Named-field access for values held in a [`KeyedStore`](super::KeyedStore).

use std::sync::Arc;

use crate::value::FieldValue;

/// A value whose fields can be read by name.
///
/// Implement this for the state types you keep in a store to enable
/// [`KeyedStore::find_key_by_field`](super::KeyedStore::find_key_by_field).
///
/// ```
/// use botloop::{FieldValue, Record};
///
/// struct Session {
///     username: String,
///     step: i64,
/// }
///
/// impl Record for Session {
///     fn field(&self, name: &str) -> Option<FieldValue> {
///         match name {
///             "username" => Some(self.username.as_str().into()),
///             "step" => Some(self.step.into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Record {
    /// Returns the value of the named field, or `None` if the field does not exist.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Returns false for values that carry no record at all (an empty `Option`).
    fn is_record(&self) -> bool {
        true
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<FieldValue> {
        (**self).field(name)
    }

    fn is_record(&self) -> bool {
        (**self).is_record()
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        (**self).field(name)
    }

    fn is_record(&self) -> bool {
        (**self).is_record()
    }
}

impl<R: Record + ?Sized> Record for Arc<R> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        (**self).field(name)
    }

    fn is_record(&self) -> bool {
        (**self).is_record()
    }
}

impl<R: Record> Record for Option<R> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.as_ref().and_then(|r| r.field(name))
    }

    fn is_record(&self) -> bool {
        self.as_ref().is_some_and(Record::is_record)
    }
}
