//! # Paranoia Runtime
//!
//! The lifecycle engine for paranoid records.
//!
//! [`ParanoidEngine`] ties an immutable [`Registry`] to a [`Persistence`]
//! backend and a [`Clock`], and drives every soft delete, permanent delete
//! and recovery, cascading through dependent associations inside a single
//! transaction per call.
//!
//! ## Core Components
//!
//! - **Lifecycle**: `destroy`, `delete`, their permanent forms and `recover`
//! - **Cascade**: hard-destroy and windowed recovery of dependents
//! - **Queries**: scoped reads and bulk operations through [`ModelQuery`]
//! - **Validation**: uniqueness checks that ignore deleted rows
//!
//! ## Example
//!
//! ```ignore
//! use paranoia_runtime::{ParanoidEngine, RecoverOptions};
//!
//! let engine = ParanoidEngine::new(Arc::new(registry), Arc::new(store));
//!
//! engine.destroy(&mut post).await?;
//! assert!(engine.is_deleted(&post));
//!
//! engine.recover(&mut post, RecoverOptions::default()).await?;
//! let visible = engine.model("Post")?.all().fetch().await?;
//! ```

use crate::context::TxContext;
use paranoia_core::config::ParanoidConfiguration;
use paranoia_core::environment::{Clock, SystemClock};
use paranoia_core::error::{ParanoidError, Result};
use paranoia_core::persistence::Persistence;
use paranoia_core::record::Record;
use paranoia_core::registry::Registry;
use std::sync::Arc;

/// Explicit transaction context for cascading operations
mod context;

/// Destroy, delete and recover
pub mod lifecycle;

/// Cascade resolver
mod cascade;

/// Scoped reads and bulk operations
pub mod query;

/// Uniqueness validation ignoring deleted rows
pub mod validation;

/// Lifecycle counters
pub mod metrics;

pub use lifecycle::RecoverOptions;
pub use query::ModelQuery;

/// Entry point for paranoid lifecycle operations.
///
/// Cheap to clone; all state is behind `Arc`s.
#[derive(Clone)]
pub struct ParanoidEngine {
    registry: Arc<Registry>,
    persistence: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
}

impl ParanoidEngine {
    /// Create an engine reading time from the system clock.
    #[must_use]
    pub fn new(registry: Arc<Registry>, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            registry,
            persistence,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for deletion timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The registry this engine serves.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// `true` when the record's primary marker holds a deleted value.
    ///
    /// Always `false` for types that are not paranoid.
    #[must_use]
    pub fn is_deleted(&self, record: &Record) -> bool {
        self.registry
            .paranoid_config(record.record_type())
            .is_some_and(|config| config.is_deleted(record))
    }

    /// `true` once the record was permanently deleted.
    ///
    /// Rows read back from storage after a permanent delete report `true` too.
    #[must_use]
    pub fn is_permanently_deleted(&self, record: &Record) -> bool {
        record.is_frozen()
    }

    /// Paranoid configuration of `record_type`.
    ///
    /// # Errors
    ///
    /// [`ParanoidError::UnknownRecordType`] for undescribed types and
    /// [`ParanoidError::NotParanoid`] for types that were never configured.
    pub(crate) fn paranoid(&self, record_type: &str) -> Result<Arc<ParanoidConfiguration>> {
        let model = self
            .registry
            .model(record_type)
            .ok_or_else(|| ParanoidError::UnknownRecordType(record_type.to_string()))?;
        model
            .paranoid()
            .map(Arc::clone)
            .ok_or_else(|| ParanoidError::NotParanoid(record_type.to_string()))
    }

    /// Commit or roll back the outermost transaction depending on `outcome`.
    ///
    /// After a commit, counters are emitted and `after_destroy_commit`
    /// callbacks run; their failures are logged and never surface.
    pub(crate) async fn finish<T>(
        &self,
        context: TxContext,
        record_type: &str,
        outcome: Result<T>,
    ) -> Result<T> {
        let value = match outcome {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(record_type, error = %error, "Rolling back lifecycle operation");
                context.rollback().await;
                metrics::record_rollback(record_type);
                return Err(error);
            }
        };

        let committed = match context.commit().await {
            Ok(committed) => committed,
            Err(error) => {
                tracing::warn!(record_type, error = %error, "Commit failed");
                metrics::record_rollback(record_type);
                return Err(error);
            }
        };
        for (transition, record_type, count) in &committed.transitions {
            metrics::record_transition(*transition, record_type, *count);
        }
        for record in &committed.after_commit {
            if let Err(error) = self.registry.callbacks().dispatch(
                paranoia_core::callbacks::HookPoint::AfterDestroyCommit,
                record,
            ) {
                tracing::warn!(
                    record_type = record.record_type(),
                    id = ?record.id(),
                    error = %error,
                    "after_destroy_commit callback failed"
                );
            }
        }
        Ok(value)
    }
}

impl std::fmt::Debug for ParanoidEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParanoidEngine")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
