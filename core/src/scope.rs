//! Scope predicates for paranoid record types.
//!
//! Every read against a paranoid type is filtered through one of these
//! predicates. The default scope hides deleted rows; [`Scope::WithDeleted`]
//! lifts the filter for a single query and never changes registry state.

use crate::column::ColumnType;
use crate::config::ParanoidConfiguration;
use crate::predicate::Predicate;
use crate::value::FieldValue;
use chrono::{DateTime, Duration, Utc};

/// Which rows a query should see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only rows that are not deleted.
    #[default]
    Default,
    /// Every row, deleted or not.
    WithDeleted,
    /// Only deleted rows.
    OnlyDeleted,
}

/// Builds predicates from a type's paranoid configuration.
///
/// # Examples
///
/// ```
/// use paranoia_core::config::ParanoidConfiguration;
/// use paranoia_core::scope::ParanoidScope;
///
/// let config = ParanoidConfiguration::default();
/// let scope = ParanoidScope::new(&config);
/// assert_eq!(scope.not_deleted().to_string(), "deleted_at IS NULL");
/// assert_eq!(scope.only_deleted().to_string(), "NOT (deleted_at IS NULL)");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ParanoidScope<'a> {
    config: &'a ParanoidConfiguration,
}

impl<'a> ParanoidScope<'a> {
    /// Scope builder over `config`.
    #[must_use]
    pub const fn new(config: &'a ParanoidConfiguration) -> Self {
        Self { config }
    }

    /// Rows whose primary marker holds the non-deleted sentinel.
    #[must_use]
    pub fn not_deleted(&self) -> Predicate {
        let primary = self.config.primary();
        match primary.non_deleted_value() {
            FieldValue::Null => Predicate::is_null(primary.column()),
            sentinel => Predicate::equals(primary.column(), sentinel),
        }
    }

    /// Rows that are deleted.
    #[must_use]
    pub fn only_deleted(&self) -> Predicate {
        !self.not_deleted()
    }

    /// Deleted rows whose marker lies within `window` of `pivot`.
    ///
    /// Only time columns carry enough information to match on; for any
    /// other column type, or a pivot that is not a timestamp, this returns
    /// [`only_deleted`](Self::only_deleted).
    ///
    /// A negative window is taken by its magnitude. Bounds saturate at the
    /// earliest and latest representable times.
    #[must_use]
    pub fn deleted_within_window(&self, pivot: &FieldValue, window: Duration) -> Predicate {
        let primary = self.config.primary();
        match (primary.column_type(), pivot.as_time()) {
            (ColumnType::Time, Some(at)) => {
                let window = window.abs();
                let low = at
                    .checked_sub_signed(window)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                let high = at
                    .checked_add_signed(window)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                Predicate::between(primary.column(), low, high)
            }
            _ => self.only_deleted(),
        }
    }

    /// Rows deleted at or after `at`.
    ///
    /// Non-time primary columns match no row.
    #[must_use]
    pub fn deleted_after(&self, at: DateTime<Utc>) -> Predicate {
        let primary = self.config.primary();
        match primary.column_type() {
            ColumnType::Time => Predicate::Ge(primary.column().to_string(), at.into()),
            ColumnType::Boolean | ColumnType::String => Predicate::Never,
        }
    }

    /// Rows deleted at or before `at`.
    ///
    /// Non-time primary columns match no row.
    #[must_use]
    pub fn deleted_before(&self, at: DateTime<Utc>) -> Predicate {
        let primary = self.config.primary();
        match primary.column_type() {
            ColumnType::Time => Predicate::Le(primary.column().to_string(), at.into()),
            ColumnType::Boolean | ColumnType::String => Predicate::Never,
        }
    }

    /// Resolve a [`Scope`] into the predicate handed to storage.
    #[must_use]
    pub fn resolve(&self, scope: Scope) -> Predicate {
        match scope {
            Scope::Default => self.not_deleted(),
            Scope::WithDeleted => Predicate::Always,
            Scope::OnlyDeleted => self.only_deleted(),
        }
    }
}
