//! Persistence collaborator contract.
//!
//! The engine never talks to a database directly. It describes the rows it
//! wants with a [`Predicate`] and the writes it needs with [`Assignment`]s;
//! an implementation of [`Persistence`] executes them.
//!
//! # Transactions
//!
//! Every outermost lifecycle operation opens exactly one [`Transaction`]
//! through [`Persistence::begin`]. Cascaded work joins it. The engine calls
//! [`Transaction::commit`] on success and [`Transaction::rollback`] on any
//! failure; an implementation must guarantee that nothing written through a
//! rolled-back transaction becomes visible.
//!
//! # Permanent deletion
//!
//! A permanently deleted row stays readable but is frozen in storage:
//! selects return it in the [`PersistenceState::Frozen`] state,
//! [`Transaction::update_where`] never touches it and [`Transaction::save`]
//! rejects it with [`StorageError::Conflict`].
//!
//! [`PersistenceState::Frozen`]: crate::record::PersistenceState::Frozen
//!
//! # Dyn compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` so that both traits can be used as
//! trait objects (`Arc<dyn Persistence>`, `Box<dyn Transaction>`).

use crate::predicate::Predicate;
use crate::record::Record;
use crate::value::FieldValue;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors reported by a persistence implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Write conflict detected by the store.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// A row expected to exist was not found.
    #[error("Row not found: {record_type} {id}")]
    RowNotFound {
        /// The record type.
        record_type: String,
        /// The missing id.
        id: String,
    },

    /// Anything else.
    #[error("Storage error: {0}")]
    Other(String),
}

/// Boxed future returned by persistence methods.
pub type StorageFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// A single `column = value` write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// Column to write.
    pub column: String,
    /// Value to write.
    pub value: FieldValue,
}

impl Assignment {
    /// Create an assignment.
    #[must_use]
    pub fn new(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Apply the assignment to an in-memory record.
    pub fn apply(&self, record: &mut Record) {
        record.set(self.column.clone(), self.value.clone());
    }
}

/// Entry point to the store.
pub trait Persistence: Send + Sync {
    /// Read rows of `record_type` matching `predicate`, outside any transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails.
    fn select<'a>(
        &'a self,
        record_type: &'a str,
        predicate: &'a Predicate,
    ) -> StorageFuture<'a, Vec<Record>>;

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if no transaction can be started.
    fn begin(&self) -> StorageFuture<'_, Box<dyn Transaction>>;
}

/// An open transaction.
pub trait Transaction: Send {
    /// Read rows of `record_type` matching `predicate`, seeing this
    /// transaction's own writes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails.
    fn select<'a>(
        &'a mut self,
        record_type: &'a str,
        predicate: &'a Predicate,
    ) -> StorageFuture<'a, Vec<Record>>;

    /// Apply `assignments` to every row matching `predicate` in one statement.
    ///
    /// Frozen rows are skipped. Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the update fails.
    fn update_where<'a>(
        &'a mut self,
        record_type: &'a str,
        predicate: &'a Predicate,
        assignments: &'a [Assignment],
    ) -> StorageFuture<'a, u64>;

    /// Move every row matching `predicate` into the frozen terminal state.
    ///
    /// Returns the number of rows newly frozen.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the update fails.
    fn freeze_where<'a>(
        &'a mut self,
        record_type: &'a str,
        predicate: &'a Predicate,
    ) -> StorageFuture<'a, u64>;

    /// Persist every attribute of `record`, which must have an identity.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RowNotFound`] if the row does not exist and
    /// [`StorageError::Conflict`] if it is frozen.
    fn save<'a>(&'a mut self, record: &'a Record) -> StorageFuture<'a, ()>;

    /// Make every write visible.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the commit fails; nothing is applied then.
    fn commit(self: Box<Self>) -> StorageFuture<'static, ()>;

    /// Discard every write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the rollback itself fails.
    fn rollback(self: Box<Self>) -> StorageFuture<'static, ()>;
}
