//! Error types for configuration and lifecycle operations.

use crate::callbacks::HookPoint;
use crate::persistence::StorageError;
use crate::value::RecordId;
use thiserror::Error;

/// Errors raised while registering a record type.
///
/// These are local to the registration call: a failed `configure` leaves every
/// previously configured type untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The options value was not a mapping.
    #[error("Paranoid options must be a mapping, got {0}")]
    NotAMapping(String),

    /// `column_type` outside `{time, boolean, string}`.
    #[error("Unsupported column type '{0}' (expected time, boolean or string)")]
    UnsupportedColumnType(String),

    /// A `columns` list with no entries.
    #[error("Paranoid options list no columns")]
    NoColumns,

    /// `deleted_value` given for a column type that computes its own value.
    #[error("Column '{column}' of type {column_type} does not accept a deleted_value")]
    DeletedValueNotSupported {
        /// The offending column.
        column: String,
        /// Its declared type.
        column_type: String,
    },

    /// Unknown keys, ill-typed values or misplaced options.
    #[error("Invalid paranoid options: {0}")]
    InvalidOptions(String),

    /// A hook was registered for a point that this record type never installed.
    #[error("Hook point {point} is not installed for record type '{record_type}'")]
    HookNotInstalled {
        /// The record type.
        record_type: String,
        /// The missing hook point.
        point: HookPoint,
    },
}

/// Errors surfaced by lifecycle, cascade and query operations.
#[derive(Error, Debug)]
pub enum ParanoidError {
    /// Invalid registration input.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Failure reported by the persistence collaborator, propagated unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The record cannot undergo the requested transition.
    #[error(
        "Invalid state for {record_type} {}: {reason}",
        .id.map_or_else(|| "(new)".to_string(), |id| id.to_string())
    )]
    InvalidState {
        /// The record type.
        record_type: String,
        /// The record id, if any.
        id: Option<RecordId>,
        /// Why the transition was refused.
        reason: String,
    },

    /// A hook or observer rejected the operation.
    #[error("{point} callback for {record_type} failed: {message}")]
    Callback {
        /// The record type.
        record_type: String,
        /// The hook point that failed.
        point: HookPoint,
        /// The message reported by the hook.
        message: String,
    },

    /// The record type was never registered.
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// The record type is registered but not paranoid-enabled.
    #[error("Record type '{0}' is not configured for soft deletion")]
    NotParanoid(String),

    /// Another live row already holds the same values.
    #[error("{record_type} with the same {} already exists", .columns.join(", "))]
    UniquenessViolation {
        /// The record type.
        record_type: String,
        /// The columns checked.
        columns: Vec<String>,
    },
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, ParanoidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_display_includes_identity() {
        let error = ParanoidError::InvalidState {
            record_type: "Post".to_string(),
            id: Some(RecordId::new(4)),
            reason: "record is permanently deleted".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("Post 4"));
        assert!(display.contains("permanently deleted"));
    }

    #[test]
    fn invalid_state_display_for_new_record() {
        let error = ParanoidError::InvalidState {
            record_type: "Post".to_string(),
            id: None,
            reason: "record has no identity".to_string(),
        };
        assert!(error.to_string().contains("(new)"));
    }

    #[test]
    fn uniqueness_violation_lists_columns() {
        let error = ParanoidError::UniquenessViolation {
            record_type: "User".to_string(),
            columns: vec!["email".to_string(), "tenant_id".to_string()],
        };
        assert_eq!(error.to_string(), "User with the same email, tenant_id already exists");
    }

    #[test]
    fn storage_errors_convert() {
        let error: ParanoidError = StorageError::Database("connection reset".to_string()).into();
        assert!(matches!(error, ParanoidError::Storage(_)));
    }
}
