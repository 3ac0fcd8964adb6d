//! Per-type paranoid configuration and options parsing.
//!
//! A [`ParanoidConfiguration`] has exactly one primary marker column, which
//! alone decides whether a record is deleted, plus any number of secondary
//! columns that are written alongside it on every delete.
//!
//! Configurations are usually built from a JSON mapping:
//!
//! ```
//! use paranoia_core::config::ParanoidConfiguration;
//! use serde_json::json;
//!
//! let config = ParanoidConfiguration::from_options(&json!({
//!     "columns": [
//!         { "column": "is_deleted", "column_type": "boolean" },
//!         { "column": "deleted_at", "column_type": "time" }
//!     ]
//! }))
//! .unwrap();
//!
//! assert_eq!(config.primary().column(), "is_deleted");
//! assert_eq!(config.secondary().len(), 1);
//! ```
//!
//! Recognized keys per column: `column`, `column_type`, `deleted_value`
//! (string columns only), `recover_dependent_associations`,
//! `dependent_recovery_window` (seconds) and `double_tap_destroys_fully`.
//! The last three only apply to the primary column.

use crate::column::{ColumnType, DEFAULT_COLUMN, ParanoidColumnConfig};
use crate::error::ConfigurationError;
use crate::persistence::Assignment;
use crate::record::Record;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Soft-delete configuration of one record type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParanoidConfiguration {
    primary: ParanoidColumnConfig,
    secondary: Vec<ParanoidColumnConfig>,
}

impl ParanoidConfiguration {
    /// Configuration with a single primary column.
    #[must_use]
    pub const fn new(primary: ParanoidColumnConfig) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
        }
    }

    /// Append a secondary column.
    #[must_use]
    pub fn with_secondary(mut self, column: ParanoidColumnConfig) -> Self {
        self.secondary.push(column);
        self
    }

    /// Parse a JSON options mapping.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::NotAMapping`] if `options` is not an object
    /// - [`ConfigurationError::UnsupportedColumnType`] for a `column_type`
    ///   outside `{time, boolean, string}`
    /// - [`ConfigurationError::NoColumns`] for an empty `columns` list
    /// - [`ConfigurationError::DeletedValueNotSupported`] for a `deleted_value`
    ///   on a non-string column
    /// - [`ConfigurationError::InvalidOptions`] for unknown keys, ill-typed
    ///   values or primary-only keys on a secondary column
    pub fn from_options(options: &Value) -> Result<Self, ConfigurationError> {
        let Value::Object(map) = options else {
            return Err(ConfigurationError::NotAMapping(describe(options)));
        };

        let Some(columns) = map.get("columns") else {
            let primary = ColumnOptions::parse(options)?.into_column(true)?;
            return Ok(Self::new(primary));
        };

        if map.len() > 1 {
            return Err(ConfigurationError::InvalidOptions(
                "`columns` cannot be combined with single-column keys".to_string(),
            ));
        }
        let Value::Array(entries) = columns else {
            return Err(ConfigurationError::InvalidOptions(format!(
                "`columns` must be a list, got {}",
                describe(columns)
            )));
        };

        let mut parsed = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_object() {
                return Err(ConfigurationError::NotAMapping(describe(entry)));
            }
            parsed.push(ColumnOptions::parse(entry)?.into_column(index == 0)?);
        }

        let mut parsed = parsed.into_iter();
        let primary = parsed.next().ok_or(ConfigurationError::NoColumns)?;
        Ok(Self {
            primary,
            secondary: parsed.collect(),
        })
    }

    /// The column that decides deleted state and drives scoping.
    #[must_use]
    pub const fn primary(&self) -> &ParanoidColumnConfig {
        &self.primary
    }

    /// Columns written on delete but never read for scoping.
    #[must_use]
    pub fn secondary(&self) -> &[ParanoidColumnConfig] {
        &self.secondary
    }

    /// Primary first, then secondary columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ParanoidColumnConfig> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }

    /// `true` when the record's primary marker differs from its sentinel.
    #[must_use]
    pub fn is_deleted(&self, record: &Record) -> bool {
        self.primary
            .is_deleted_value(record.get(self.primary.column()))
    }

    /// Assignments writing every configured column to its deleted value.
    #[must_use]
    pub fn deleted_assignments(&self, now: DateTime<Utc>) -> Vec<Assignment> {
        self.columns()
            .map(|column| Assignment::new(column.column(), column.deleted_value_at(now)))
            .collect()
    }

    /// Assignment restoring the primary column to its non-deleted sentinel.
    #[must_use]
    pub fn recovery_assignment(&self) -> Assignment {
        Assignment::new(self.primary.column(), self.primary.non_deleted_value())
    }

    /// Set every marker column of a fresh record to its non-deleted value.
    pub fn initialize(&self, record: &mut Record) {
        for column in self.columns() {
            record.set(column.column(), column.non_deleted_value());
        }
    }
}

impl Default for ParanoidConfiguration {
    fn default() -> Self {
        Self::new(ParanoidColumnConfig::time(DEFAULT_COLUMN))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnOptions {
    column: Option<String>,
    column_type: Option<String>,
    deleted_value: Option<String>,
    recover_dependent_associations: Option<bool>,
    dependent_recovery_window: Option<u32>,
    double_tap_destroys_fully: Option<bool>,
}

impl ColumnOptions {
    fn parse(value: &Value) -> Result<Self, ConfigurationError> {
        Self::deserialize(value).map_err(|e| ConfigurationError::InvalidOptions(e.to_string()))
    }

    fn into_column(self, primary: bool) -> Result<ParanoidColumnConfig, ConfigurationError> {
        let column_type: ColumnType = self
            .column_type
            .as_deref()
            .map_or(Ok(ColumnType::Time), str::parse)?;
        let name = self.column.unwrap_or_else(|| DEFAULT_COLUMN.to_string());

        if !primary
            && (self.recover_dependent_associations.is_some()
                || self.dependent_recovery_window.is_some()
                || self.double_tap_destroys_fully.is_some())
        {
            return Err(ConfigurationError::InvalidOptions(format!(
                "secondary column '{name}' cannot set recovery options"
            )));
        }

        let mut column = ParanoidColumnConfig::new(name, column_type);

        if let Some(sentinel) = self.deleted_value {
            if column_type != ColumnType::String {
                return Err(ConfigurationError::DeletedValueNotSupported {
                    column: column.column().to_string(),
                    column_type: column_type.to_string(),
                });
            }
            column = column.with_deleted_value(sentinel);
        }
        if let Some(enabled) = self.recover_dependent_associations {
            column = column.with_recover_dependent_associations(enabled);
        }
        if let Some(seconds) = self.dependent_recovery_window {
            column = column.with_recovery_window(Duration::seconds(i64::from(seconds)));
        }
        if let Some(enabled) = self.double_tap_destroys_fully {
            column = column.with_double_tap_destroys_fully(enabled);
        }
        Ok(column)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(s) => format!("the string {s:?}"),
        Value::Array(_) => "a list".to_string(),
        Value::Object(_) => "a mapping".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: options below are known-valid
mod tests {
    use super::*;
    use crate::value::{FieldValue, RecordId};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn empty_mapping_yields_defaults() {
        let config = ParanoidConfiguration::from_options(&json!({})).unwrap();
        assert_eq!(config, ParanoidConfiguration::default());
        assert_eq!(config.primary().column(), "deleted_at");
        assert_eq!(config.primary().column_type(), ColumnType::Time);
    }

    #[test]
    fn single_column_options() {
        let config = ParanoidConfiguration::from_options(&json!({
            "column": "status",
            "column_type": "string",
            "deleted_value": "gone",
            "dependent_recovery_window": 300,
            "recover_dependent_associations": false
        }))
        .unwrap();

        let primary = config.primary();
        assert_eq!(primary.column(), "status");
        assert_eq!(primary.dependent_recovery_window(), Duration::minutes(5));
        assert!(!primary.recover_dependent_associations());
        assert_eq!(
            primary.deleted_value_at(Utc::now()),
            FieldValue::from("gone")
        );
    }

    #[test]
    fn rejects_non_mapping_input() {
        let error = ParanoidConfiguration::from_options(&json!("not a hash")).unwrap_err();
        assert!(matches!(error, ConfigurationError::NotAMapping(_)));
    }

    #[test]
    fn rejects_unsupported_column_type() {
        let error =
            ParanoidConfiguration::from_options(&json!({ "column_type": "integer" })).unwrap_err();
        assert_eq!(
            error,
            ConfigurationError::UnsupportedColumnType("integer".to_string())
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        let error =
            ParanoidConfiguration::from_options(&json!({ "colum": "deleted_at" })).unwrap_err();
        assert!(matches!(error, ConfigurationError::InvalidOptions(_)));
    }

    #[test]
    fn rejects_empty_column_list() {
        let error = ParanoidConfiguration::from_options(&json!({ "columns": [] })).unwrap_err();
        assert_eq!(error, ConfigurationError::NoColumns);
    }

    #[test]
    fn rejects_deleted_value_on_time_column() {
        let error = ParanoidConfiguration::from_options(&json!({ "deleted_value": "x" }))
            .unwrap_err();
        assert!(matches!(
            error,
            ConfigurationError::DeletedValueNotSupported { .. }
        ));
    }

    #[test]
    fn rejects_recovery_options_on_secondary_columns() {
        let error = ParanoidConfiguration::from_options(&json!({
            "columns": [
                { "column": "is_deleted", "column_type": "boolean" },
                { "column": "deleted_at", "dependent_recovery_window": 10 }
            ]
        }))
        .unwrap_err();
        assert!(matches!(error, ConfigurationError::InvalidOptions(_)));
    }

    #[test]
    fn deleted_state_follows_primary_column_only() {
        let config = ParanoidConfiguration::new(ParanoidColumnConfig::boolean("is_deleted"))
            .with_secondary(ParanoidColumnConfig::time("deleted_at"));
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let record = Record::persisted("Post", RecordId::new(1))
            .with_attribute("is_deleted", false)
            .with_attribute("deleted_at", now);
        assert!(!config.is_deleted(&record));

        let record = record.with_attribute("is_deleted", true);
        assert!(config.is_deleted(&record));
    }

    #[test]
    fn deleted_assignments_cover_every_column() {
        let config = ParanoidConfiguration::new(ParanoidColumnConfig::boolean("is_deleted"))
            .with_secondary(ParanoidColumnConfig::time("deleted_at"));
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            config.deleted_assignments(now),
            vec![
                Assignment::new("is_deleted", true),
                Assignment::new("deleted_at", now),
            ]
        );
    }
}
