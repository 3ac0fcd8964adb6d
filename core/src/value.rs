//! Storage values and record identity.
//!
//! Records are dynamic: every attribute is a [`FieldValue`], and every persisted
//! record carries a [`RecordId`]. Marker columns (the columns that flag a row as
//! deleted) hold one of the `Null`, `Bool`, `Text` or `Time` variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single stored attribute value.
///
/// Ordering is only defined between values of the same variant; comparing an
/// `Int` with a `Time`, or anything with `Null`, yields `None`.
///
/// # Examples
///
/// ```
/// use paranoia_core::value::FieldValue;
///
/// let a = FieldValue::Int(1);
/// let b = FieldValue::Int(2);
/// assert!(a.compare(&b).is_some_and(|o| o.is_lt()));
/// assert!(FieldValue::Null.compare(&a).is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Absent value (SQL `NULL`).
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value, also used for foreign keys.
    Int(i64),
    /// Text value.
    Text(String),
    /// UTC timestamp.
    Time(DateTime<Utc>),
}

impl FieldValue {
    /// Returns `true` for [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the timestamp if this is a [`FieldValue::Time`].
    #[must_use]
    pub const fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(time) => Some(*time),
            _ => None,
        }
    }

    /// Interprets an `Int` value as a record identifier.
    #[must_use]
    pub const fn as_record_id(&self) -> Option<RecordId> {
        match self {
            Self::Int(raw) => Some(RecordId(*raw)),
            _ => None,
        }
    }

    /// Compares two values of the same variant.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "'{value}'"),
            Self::Time(value) => write!(f, "'{}'", value.to_rfc3339()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl From<RecordId> for FieldValue {
    fn from(id: RecordId) -> Self {
        Self::Int(id.0)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Primary key of a persisted record.
///
/// # Examples
///
/// ```
/// use paranoia_core::value::{FieldValue, RecordId};
///
/// let id = RecordId::new(7);
/// assert_eq!(FieldValue::from(id).as_record_id(), Some(id));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(i64);

impl RecordId {
    /// Create a record id from its raw value.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw key value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
