//! Lifecycle state machine.
//!
//! ```text
//!            destroy / delete                 destroy / delete (again)
//!  Active ───────────────────▶ SoftDeleted ───────────────────────────▶ Frozen
//!    ▲                             │           destroy_permanently /
//!    └────────── recover ──────────┘           delete_permanently (any state)
//! ```
//!
//! `destroy*` runs the destroy callbacks, `delete*` runs none. Permanent
//! forms first destroy dependents through the cascade resolver, then write
//! every marker column in one update and freeze the instance. A frozen
//! instance ignores further deletes and refuses recovery.
//!
//! Each public operation opens one transaction. The caller's record is only
//! updated after that transaction committed; on failure it is left exactly
//! as it was passed in.

use crate::ParanoidEngine;
use crate::context::TxContext;
use crate::metrics::Transition;
use chrono::{DateTime, Duration, Utc};
use paranoia_core::callbacks::HookPoint;
use paranoia_core::config::ParanoidConfiguration;
use paranoia_core::error::{ParanoidError, Result};
use paranoia_core::predicate::Predicate;
use paranoia_core::record::Record;
use std::future::Future;
use std::pin::Pin;

pub(crate) type LifecycleFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Overrides for a single recover call.
///
/// Unset fields fall back to the primary column's configuration.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use paranoia_runtime::RecoverOptions;
///
/// let options = RecoverOptions::default()
///     .recursive(true)
///     .recovery_window(Duration::minutes(10));
/// assert_eq!(options.recursive, Some(true));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoverOptions {
    /// Whether to recover dependents deleted alongside the record.
    pub recursive: Option<bool>,
    /// Tolerance used to match dependents' deletion time to the record's.
    pub recovery_window: Option<Duration>,
}

impl RecoverOptions {
    /// Override the recursive flag.
    #[must_use]
    pub const fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    /// Override the recovery window.
    #[must_use]
    pub const fn recovery_window(mut self, window: Duration) -> Self {
        self.recovery_window = Some(window);
        self
    }

    pub(crate) fn resolve(self, config: &ParanoidConfiguration) -> Recovery {
        let primary = config.primary();
        Recovery {
            recursive: self
                .recursive
                .unwrap_or_else(|| primary.recover_dependent_associations()),
            window: self
                .recovery_window
                .unwrap_or_else(|| primary.dependent_recovery_window()),
        }
    }
}

/// Recover options with defaults applied. Dependents inherit them unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Recovery {
    pub recursive: bool,
    pub window: Duration,
}

/// A requested removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Removal {
    pub permanent: bool,
    pub callbacks: bool,
}

impl Removal {
    pub(crate) const fn destroy(permanent: bool) -> Self {
        Self {
            permanent,
            callbacks: true,
        }
    }

    pub(crate) const fn delete(permanent: bool) -> Self {
        Self {
            permanent,
            callbacks: false,
        }
    }

    /// Decide what to do with `record`. `None` means nothing to do;
    /// `Some(permanent)` gives the effective form after escalation.
    fn plan(self, config: &ParanoidConfiguration, record: &Record) -> Option<bool> {
        if record.is_frozen() {
            return None;
        }
        let already_deleted = config.is_deleted(record);
        let permanent =
            self.permanent || (already_deleted && config.primary().double_tap_destroys_fully());
        if already_deleted && !permanent {
            return None;
        }
        Some(permanent)
    }
}

fn invalid_state(record: &Record, reason: &str) -> ParanoidError {
    ParanoidError::InvalidState {
        record_type: record.record_type().to_string(),
        id: record.id(),
        reason: reason.to_string(),
    }
}

impl ParanoidEngine {
    /// Soft-delete `record`, running destroy callbacks.
    ///
    /// Destroying a record that is already soft-deleted destroys it
    /// permanently unless `double_tap_destroys_fully` is off.
    ///
    /// # Errors
    ///
    /// - [`ParanoidError::NotParanoid`] / [`ParanoidError::UnknownRecordType`]
    /// - [`ParanoidError::Callback`] if a destroy callback fails
    /// - [`ParanoidError::Storage`] if the backend fails
    pub async fn destroy(&self, record: &mut Record) -> Result<()> {
        self.remove(record, Removal::destroy(false)).await
    }

    /// Permanently delete `record` and its dependents, running destroy callbacks.
    ///
    /// # Errors
    ///
    /// See [`destroy`](Self::destroy).
    pub async fn destroy_permanently(&self, record: &mut Record) -> Result<()> {
        self.remove(record, Removal::destroy(true)).await
    }

    /// Soft-delete `record` without callbacks.
    ///
    /// # Errors
    ///
    /// See [`destroy`](Self::destroy).
    pub async fn delete(&self, record: &mut Record) -> Result<()> {
        self.remove(record, Removal::delete(false)).await
    }

    /// Permanently delete `record` without callbacks on the record itself.
    ///
    /// Dependents are still destroyed through their own lifecycle.
    ///
    /// # Errors
    ///
    /// See [`destroy`](Self::destroy).
    pub async fn delete_permanently(&self, record: &mut Record) -> Result<()> {
        self.remove(record, Removal::delete(true)).await
    }

    /// Bring a soft-deleted record back, optionally with its dependents.
    ///
    /// Only the primary marker column is reset; secondary columns keep the
    /// values the delete wrote.
    ///
    /// # Errors
    ///
    /// - [`ParanoidError::InvalidState`] for frozen records and records
    ///   without identity
    /// - [`ParanoidError::NotParanoid`] / [`ParanoidError::UnknownRecordType`]
    /// - [`ParanoidError::Callback`] if a recover callback fails
    /// - [`ParanoidError::Storage`] if the backend fails
    #[tracing::instrument(
        skip(self, record),
        fields(record_type = %record.record_type(), id = ?record.id())
    )]
    pub async fn recover(&self, record: &mut Record, options: RecoverOptions) -> Result<()> {
        let config = self.paranoid(record.record_type())?;
        if record.is_frozen() {
            return Err(invalid_state(record, "record is permanently deleted"));
        }
        if record.id().is_none() {
            return Err(invalid_state(record, "record has no identity"));
        }

        let recovery = options.resolve(&config);
        let mut context = TxContext::begin(self.persistence.as_ref()).await?;
        let mut working = record.clone();
        let outcome = self.recover_within(&mut context, &mut working, recovery).await;
        self.finish(context, record.record_type(), outcome).await?;

        tracing::info!(recursive = recovery.recursive, "Recovered record");
        *record = working;
        Ok(())
    }

    #[tracing::instrument(
        name = "remove",
        skip(self, record),
        fields(record_type = %record.record_type(), id = ?record.id())
    )]
    async fn remove(&self, record: &mut Record, removal: Removal) -> Result<()> {
        let config = self.paranoid(record.record_type())?;
        let Some(permanent) = removal.plan(&config, record) else {
            tracing::debug!(frozen = record.is_frozen(), "Nothing to delete");
            return Ok(());
        };

        let now = self.clock.now();
        if record.id().is_none() {
            for assignment in config.deleted_assignments(now) {
                assignment.apply(record);
            }
            if permanent {
                record.freeze();
            }
            tracing::debug!(permanent, "Marked unsaved record deleted");
            return Ok(());
        }

        let mut context = TxContext::begin(self.persistence.as_ref()).await?;
        let mut working = record.clone();
        let outcome = self
            .remove_within(&mut context, &mut working, removal, now)
            .await;
        self.finish(context, record.record_type(), outcome).await?;

        tracing::info!(permanent, "Deleted record");
        *record = working;
        Ok(())
    }

    /// Remove `record` inside an open transaction.
    pub(crate) fn remove_within<'a>(
        &'a self,
        context: &'a mut TxContext,
        record: &'a mut Record,
        removal: Removal,
        now: DateTime<Utc>,
    ) -> LifecycleFuture<'a> {
        Box::pin(async move {
            let config = self.paranoid(record.record_type())?;
            let Some(permanent) = removal.plan(&config, record) else {
                return Ok(());
            };
            let Some(id) = record.id() else {
                return Err(invalid_state(record, "record has no identity"));
            };
            if !context.first_visit(record.record_type(), id) {
                tracing::debug!(record_type = record.record_type(), %id, "Already processed");
                return Ok(());
            }

            let callbacks = self.registry.callbacks();
            if removal.callbacks {
                callbacks.dispatch(HookPoint::BeforeDestroy, record)?;
            }
            if permanent {
                self.hard_destroy_dependents(context, record, now).await?;
            }

            let assignments = config.deleted_assignments(now);
            let row = Predicate::IdEq(id);
            context
                .tx()
                .update_where(record.record_type(), &row, &assignments)
                .await?;
            for assignment in &assignments {
                assignment.apply(record);
            }
            let transition = if permanent {
                context.tx().freeze_where(record.record_type(), &row).await?;
                record.freeze();
                Transition::PermanentlyDeleted
            } else {
                Transition::SoftDeleted
            };
            context.note(transition, record.record_type(), 1);
            tracing::debug!(
                record_type = record.record_type(),
                %id,
                permanent,
                "Wrote deletion markers"
            );

            if removal.callbacks {
                callbacks.dispatch(HookPoint::AfterDestroy, record)?;
                context.defer_after_commit(record.clone());
            }
            Ok(())
        })
    }

    /// Recover `record` inside an open transaction.
    pub(crate) fn recover_within<'a>(
        &'a self,
        context: &'a mut TxContext,
        record: &'a mut Record,
        recovery: Recovery,
    ) -> LifecycleFuture<'a> {
        Box::pin(async move {
            let config = self.paranoid(record.record_type())?;
            if record.is_frozen() {
                return Err(invalid_state(record, "record is permanently deleted"));
            }
            let Some(id) = record.id() else {
                return Err(invalid_state(record, "record has no identity"));
            };
            if !context.first_visit(record.record_type(), id) {
                tracing::debug!(record_type = record.record_type(), %id, "Already processed");
                return Ok(());
            }

            let callbacks = self.registry.callbacks();
            callbacks.dispatch(HookPoint::BeforeRecover, record)?;

            let was_deleted = config.is_deleted(record);
            if recovery.recursive && was_deleted {
                let pivot = record.get(config.primary().column()).clone();
                self.recover_dependents(context, record, &pivot, recovery)
                    .await?;
            }

            config.recovery_assignment().apply(record);
            context.tx().save(record).await?;
            if was_deleted {
                context.note(Transition::Recovered, record.record_type(), 1);
            }
            tracing::debug!(
                record_type = record.record_type(),
                %id,
                was_deleted,
                "Cleared deletion marker"
            );

            callbacks.dispatch(HookPoint::AfterRecover, record)?;
            Ok(())
        })
    }
}
