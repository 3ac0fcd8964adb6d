//! Query predicates handed to the persistence layer.
//!
//! The engine never generates SQL. It describes the rows it wants with a
//! [`Predicate`] and lets the persistence collaborator translate it.
//! [`Predicate::matches`] gives the reference semantics that every backend
//! must agree with; the in-memory test backend evaluates it directly.

use crate::record::Record;
use crate::value::{FieldValue, RecordId};
use std::fmt;
use std::ops::Not;

/// A boolean condition over the rows of one record type.
///
/// # Examples
///
/// ```
/// use paranoia_core::predicate::Predicate;
/// use paranoia_core::record::Record;
/// use paranoia_core::value::RecordId;
///
/// let live = Predicate::is_null("deleted_at");
/// let post = Record::persisted("Post", RecordId::new(1));
/// assert!(live.matches(&post));
/// assert!(!(!live).matches(&post));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every row.
    Always,
    /// Matches no row.
    Never,
    /// Row was permanently deleted.
    ///
    /// Backends persist the terminal state written by
    /// [`Transaction::freeze_where`](crate::persistence::Transaction::freeze_where).
    Frozen,
    /// Column is `NULL`.
    IsNull(String),
    /// Column equals the value.
    Eq(String, FieldValue),
    /// Column is greater than or equal to the value.
    Ge(String, FieldValue),
    /// Column is less than or equal to the value.
    Le(String, FieldValue),
    /// Column lies in the inclusive range.
    Between {
        /// Column name.
        column: String,
        /// Inclusive lower bound.
        low: FieldValue,
        /// Inclusive upper bound.
        high: FieldValue,
    },
    /// Primary key equals the id.
    IdEq(RecordId),
    /// Primary key is one of the ids.
    IdIn(Vec<RecordId>),
    /// Negation.
    Not(Box<Predicate>),
    /// Conjunction; an empty list matches every row.
    And(Vec<Predicate>),
}

impl Predicate {
    /// `column IS NULL`.
    #[must_use]
    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    /// `column = value`.
    #[must_use]
    pub fn equals(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    /// `column BETWEEN low AND high`.
    #[must_use]
    pub fn between(
        column: impl Into<String>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Self::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Rows that were not permanently deleted.
    #[must_use]
    pub fn not_frozen() -> Self {
        !Self::Frozen
    }

    /// Combine with another predicate, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Always, other) | (other, Self::Always) => other,
            (Self::Never, _) | (_, Self::Never) => Self::Never,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (other, Self::And(mut right)) => {
                right.insert(0, other);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Evaluate the predicate against a record.
    ///
    /// Comparisons against `NULL` or across value kinds never match.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Frozen => record.is_frozen(),
            Self::IsNull(column) => record.get(column).is_null(),
            Self::Eq(column, value) => record.get(column) == value,
            Self::Ge(column, value) => record
                .get(column)
                .compare(value)
                .is_some_and(std::cmp::Ordering::is_ge),
            Self::Le(column, value) => record
                .get(column)
                .compare(value)
                .is_some_and(std::cmp::Ordering::is_le),
            Self::Between { column, low, high } => {
                let current = record.get(column);
                current.compare(low).is_some_and(std::cmp::Ordering::is_ge)
                    && current.compare(high).is_some_and(std::cmp::Ordering::is_le)
            }
            Self::IdEq(id) => record.id() == Some(*id),
            Self::IdIn(ids) => record.id().is_some_and(|id| ids.contains(&id)),
            Self::Not(inner) => !inner.matches(record),
            Self::And(parts) => parts.iter().all(|part| part.matches(record)),
        }
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Always => Self::Never,
            Self::Never => Self::Always,
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "TRUE"),
            Self::Never => write!(f, "FALSE"),
            Self::Frozen => write!(f, "FROZEN"),
            Self::IsNull(column) => write!(f, "{column} IS NULL"),
            Self::Eq(column, value) => write!(f, "{column} = {value}"),
            Self::Ge(column, value) => write!(f, "{column} >= {value}"),
            Self::Le(column, value) => write!(f, "{column} <= {value}"),
            Self::Between { column, low, high } => {
                write!(f, "{column} BETWEEN {low} AND {high}")
            }
            Self::IdEq(id) => write!(f, "id = {id}"),
            Self::IdIn(ids) => {
                let list: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "id IN ({})", list.join(", "))
            }
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::And(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| format!("({p})")).collect();
                if rendered.is_empty() {
                    write!(f, "TRUE")
                } else {
                    write!(f, "{}", rendered.join(" AND "))
                }
            }
        }
    }
}
