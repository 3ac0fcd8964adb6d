//! Transaction context threaded through cascading operations.
//!
//! One [`TxContext`] exists per outermost lifecycle call. It owns the open
//! transaction, remembers which records were already processed so that
//! association cycles terminate, and collects the work that may only happen
//! once the transaction has committed.

use crate::metrics::Transition;
use paranoia_core::error::Result;
use paranoia_core::persistence::{Persistence, Transaction};
use paranoia_core::record::Record;
use paranoia_core::value::RecordId;
use std::collections::HashSet;

/// State shared by every step of one outermost operation.
pub(crate) struct TxContext {
    transaction: Box<dyn Transaction>,
    visited: HashSet<(String, RecordId)>,
    after_commit: Vec<Record>,
    transitions: Vec<(Transition, String, u64)>,
}

/// What a successful commit leaves behind.
#[derive(Debug, Default)]
pub(crate) struct Committed {
    /// Records whose `after_destroy_commit` callbacks are due.
    pub after_commit: Vec<Record>,
    /// State changes to report.
    pub transitions: Vec<(Transition, String, u64)>,
}

impl TxContext {
    pub(crate) async fn begin(persistence: &dyn Persistence) -> Result<Self> {
        let transaction = persistence.begin().await?;
        Ok(Self {
            transaction,
            visited: HashSet::new(),
            after_commit: Vec::new(),
            transitions: Vec::new(),
        })
    }

    /// The open transaction.
    pub(crate) fn tx(&mut self) -> &mut dyn Transaction {
        self.transaction.as_mut()
    }

    /// Record a visit. Returns `false` if the record was already processed.
    pub(crate) fn first_visit(&mut self, record_type: &str, id: RecordId) -> bool {
        self.visited.insert((record_type.to_string(), id))
    }

    pub(crate) fn defer_after_commit(&mut self, record: Record) {
        self.after_commit.push(record);
    }

    pub(crate) fn note(&mut self, transition: Transition, record_type: &str, count: u64) {
        if count > 0 {
            self.transitions
                .push((transition, record_type.to_string(), count));
        }
    }

    pub(crate) async fn commit(self) -> Result<Committed> {
        self.transaction.commit().await?;
        tracing::debug!(visited = self.visited.len(), "Committed transaction");
        Ok(Committed {
            after_commit: self.after_commit,
            transitions: self.transitions,
        })
    }

    /// Roll back, logging a failed rollback instead of masking the original error.
    pub(crate) async fn rollback(self) {
        if let Err(error) = self.transaction.rollback().await {
            tracing::warn!(error = %error, "Rollback failed");
        }
    }
}
