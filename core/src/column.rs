//! Marker column configuration.
//!
//! A paranoid record type flags deleted rows through one or more *marker
//! columns*. Each column has a [`ColumnType`] that fixes both the value written
//! on deletion and the sentinel meaning "not deleted":
//!
//! | type      | deleted value           | non-deleted value |
//! |-----------|-------------------------|-------------------|
//! | `time`    | current time            | `NULL`            |
//! | `boolean` | `true`                  | `false`           |
//! | `string`  | sentinel (`"deleted"`)  | `NULL`            |

use crate::error::ConfigurationError;
use crate::value::FieldValue;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default marker column name.
pub const DEFAULT_COLUMN: &str = "deleted_at";

/// Default sentinel written into `string` marker columns.
pub const DEFAULT_DELETED_SENTINEL: &str = "deleted";

/// Default tolerance, in seconds, used to match dependents during cascade recovery.
pub const DEFAULT_RECOVERY_WINDOW_SECS: i64 = 120;

/// Kind of value stored in a marker column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Deletion timestamp; `NULL` while active.
    Time,
    /// Deletion flag; `false` while active.
    Boolean,
    /// Deletion sentinel string; `NULL` while active.
    String,
}

impl ColumnType {
    /// Lowercase name as used in configuration options.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Self::Time),
            "boolean" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            other => Err(ConfigurationError::UnsupportedColumnType(other.to_string())),
        }
    }
}

/// Configuration of a single marker column.
///
/// The recovery settings (`recover_dependent_associations`,
/// `dependent_recovery_window`, `double_tap_destroys_fully`) are only read
/// from the primary column of a [`ParanoidConfiguration`](crate::config::ParanoidConfiguration).
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use paranoia_core::column::{ColumnType, ParanoidColumnConfig};
/// use paranoia_core::value::FieldValue;
///
/// let column = ParanoidColumnConfig::string("status")
///     .with_deleted_value("archived")
///     .with_recovery_window(Duration::minutes(5));
///
/// assert_eq!(column.column_type(), ColumnType::String);
/// assert!(column.is_deleted_value(&FieldValue::from("archived")));
/// assert!(!column.is_deleted_value(&FieldValue::Null));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParanoidColumnConfig {
    column: String,
    column_type: ColumnType,
    deleted_sentinel: String,
    recover_dependent_associations: bool,
    dependent_recovery_window: Duration,
    double_tap_destroys_fully: bool,
}

impl ParanoidColumnConfig {
    /// Create a column of the given type with default settings.
    #[must_use]
    pub fn new(column: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            column: column.into(),
            column_type,
            deleted_sentinel: DEFAULT_DELETED_SENTINEL.to_string(),
            recover_dependent_associations: true,
            dependent_recovery_window: Duration::seconds(DEFAULT_RECOVERY_WINDOW_SECS),
            double_tap_destroys_fully: true,
        }
    }

    /// A `time` column.
    #[must_use]
    pub fn time(column: impl Into<String>) -> Self {
        Self::new(column, ColumnType::Time)
    }

    /// A `boolean` column.
    #[must_use]
    pub fn boolean(column: impl Into<String>) -> Self {
        Self::new(column, ColumnType::Boolean)
    }

    /// A `string` column.
    #[must_use]
    pub fn string(column: impl Into<String>) -> Self {
        Self::new(column, ColumnType::String)
    }

    /// Set the sentinel written on deletion. Only `string` columns use it.
    #[must_use]
    pub fn with_deleted_value(mut self, sentinel: impl Into<String>) -> Self {
        self.deleted_sentinel = sentinel.into();
        self
    }

    /// Enable or disable cascading recovery by default.
    #[must_use]
    pub fn with_recover_dependent_associations(mut self, enabled: bool) -> Self {
        self.recover_dependent_associations = enabled;
        self
    }

    /// Set the default recovery window.
    #[must_use]
    pub fn with_recovery_window(mut self, window: Duration) -> Self {
        self.dependent_recovery_window = window;
        self
    }

    /// Choose whether soft-deleting an already soft-deleted record deletes it permanently.
    #[must_use]
    pub fn with_double_tap_destroys_fully(mut self, enabled: bool) -> Self {
        self.double_tap_destroys_fully = enabled;
        self
    }

    /// Storage column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Column type.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Whether recovery cascades to dependents by default.
    #[must_use]
    pub const fn recover_dependent_associations(&self) -> bool {
        self.recover_dependent_associations
    }

    /// Default recovery window.
    #[must_use]
    pub const fn dependent_recovery_window(&self) -> Duration {
        self.dependent_recovery_window
    }

    /// Whether a second soft delete escalates to a permanent one.
    #[must_use]
    pub const fn double_tap_destroys_fully(&self) -> bool {
        self.double_tap_destroys_fully
    }

    /// Value meaning "active".
    #[must_use]
    pub const fn non_deleted_value(&self) -> FieldValue {
        match self.column_type {
            ColumnType::Time | ColumnType::String => FieldValue::Null,
            ColumnType::Boolean => FieldValue::Bool(false),
        }
    }

    /// Value written when a record is deleted at `now`.
    #[must_use]
    pub fn deleted_value_at(&self, now: DateTime<Utc>) -> FieldValue {
        match self.column_type {
            ColumnType::Time => FieldValue::Time(now),
            ColumnType::Boolean => FieldValue::Bool(true),
            ColumnType::String => FieldValue::Text(self.deleted_sentinel.clone()),
        }
    }

    /// `true` when `value` differs from the non-deleted sentinel.
    #[must_use]
    pub fn is_deleted_value(&self, value: &FieldValue) -> bool {
        *value != self.non_deleted_value()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: fixed timestamps always resolve
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_match_documented_values() {
        let column = ParanoidColumnConfig::time(DEFAULT_COLUMN);
        assert!(column.recover_dependent_associations());
        assert_eq!(column.dependent_recovery_window(), Duration::minutes(2));
        assert!(column.double_tap_destroys_fully());
    }

    #[test]
    fn boolean_sentinels() {
        let column = ParanoidColumnConfig::boolean("is_deleted");
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(column.non_deleted_value(), FieldValue::Bool(false));
        assert_eq!(column.deleted_value_at(now), FieldValue::Bool(true));
        assert!(column.is_deleted_value(&FieldValue::Null));
    }

    #[test]
    fn time_columns_write_the_given_instant() {
        let column = ParanoidColumnConfig::time("deleted_at");
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(column.deleted_value_at(now), FieldValue::Time(now));
        assert!(!column.is_deleted_value(&FieldValue::Null));
    }

    #[test]
    fn string_columns_default_to_deleted_sentinel() {
        let column = ParanoidColumnConfig::string("state");
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(column.deleted_value_at(now), FieldValue::from("deleted"));
    }

    #[test]
    fn column_type_parsing_rejects_unknown_kinds() {
        assert_eq!("boolean".parse::<ColumnType>(), Ok(ColumnType::Boolean));
        assert_eq!(
            "integer".parse::<ColumnType>(),
            Err(ConfigurationError::UnsupportedColumnType("integer".to_string()))
        );
    }
}
