//! Uniqueness validation that ignores soft-deleted rows.
//!
//! A deleted row keeps its values, so a plain uniqueness check would block
//! re-creating a record with the same email after the first one was
//! soft-deleted. This check only considers rows in the default scope.

use crate::ParanoidEngine;
use paranoia_core::error::{ParanoidError, Result};
use paranoia_core::predicate::Predicate;
use paranoia_core::record::Record;

impl ParanoidEngine {
    /// Fail if another non-deleted row of the same type holds the same
    /// values for every column in `columns`.
    ///
    /// The record itself is excluded when it has an identity. A `NULL` value
    /// only matches `NULL`.
    ///
    /// # Errors
    ///
    /// - [`ParanoidError::UniquenessViolation`] on a clash
    /// - [`ParanoidError::UnknownRecordType`] for undescribed types
    /// - [`ParanoidError::Storage`] if the read fails
    pub async fn validate_uniqueness_without_deleted(
        &self,
        record: &Record,
        columns: &[&str],
    ) -> Result<()> {
        let mut predicate = columns
            .iter()
            .map(|column| match record.get(column) {
                value if value.is_null() => Predicate::is_null(*column),
                value => Predicate::equals(*column, value.clone()),
            })
            .fold(Predicate::Always, Predicate::and);
        if let Some(id) = record.id() {
            predicate = predicate.and(!Predicate::IdEq(id));
        }

        let clash = self
            .model(record.record_type())?
            .all()
            .filter(predicate)
            .first()
            .await?;

        match clash {
            Some(existing) => {
                tracing::debug!(
                    record_type = record.record_type(),
                    existing = ?existing.id(),
                    ?columns,
                    "Uniqueness violation"
                );
                Err(ParanoidError::UniquenessViolation {
                    record_type: record.record_type().to_string(),
                    columns: columns.iter().map(ToString::to_string).collect(),
                })
            }
            None => Ok(()),
        }
    }
}
