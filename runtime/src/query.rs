//! Scoped reads and per-type bulk operations.
//!
//! A [`ModelQuery`] starts in the default scope, which hides deleted rows of
//! paranoid types. Switching scope affects that query value only.
//!
//! ```ignore
//! let live = engine.model("Post")?.fetch().await?;
//! let everything = engine.model("Post")?.with_deleted().fetch().await?;
//! let trash = engine
//!     .model("Post")?
//!     .only_deleted()
//!     .filter(Predicate::equals("author_id", 7_i64))
//!     .fetch()
//!     .await?;
//! ```
//!
//! Bulk operations bypass per-record callbacks on the listed rows and run in
//! one transaction.

use crate::ParanoidEngine;
use crate::context::TxContext;
use crate::lifecycle::RecoverOptions;
use crate::metrics::Transition;
use chrono::{DateTime, Duration, Utc};
use paranoia_core::config::ParanoidConfiguration;
use paranoia_core::error::{ParanoidError, Result};
use paranoia_core::predicate::Predicate;
use paranoia_core::record::Record;
use paranoia_core::scope::{ParanoidScope, Scope};
use paranoia_core::value::{FieldValue, RecordId};
use std::sync::Arc;

/// Query over one record type.
#[derive(Clone, Debug)]
pub struct ModelQuery<'e> {
    engine: &'e ParanoidEngine,
    record_type: String,
    config: Option<Arc<ParanoidConfiguration>>,
    scope: Scope,
    filter: Predicate,
}

impl ParanoidEngine {
    /// Start a query over `record_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::UnknownRecordType`] for undescribed types.
    pub fn model(&self, record_type: &str) -> Result<ModelQuery<'_>> {
        let model = self
            .registry
            .model(record_type)
            .ok_or_else(|| ParanoidError::UnknownRecordType(record_type.to_string()))?;
        Ok(ModelQuery {
            engine: self,
            record_type: record_type.to_string(),
            config: model.paranoid().cloned(),
            scope: Scope::Default,
            filter: Predicate::Always,
        })
    }
}

impl ModelQuery<'_> {
    /// The record type queried.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Rows that are not deleted. This is the initial scope.
    #[must_use]
    pub fn all(mut self) -> Self {
        self.scope = Scope::Default;
        self
    }

    /// Every row, deleted or not.
    #[must_use]
    pub fn with_deleted(mut self) -> Self {
        self.scope = Scope::WithDeleted;
        self
    }

    /// Deleted rows only.
    #[must_use]
    pub fn only_deleted(mut self) -> Self {
        self.scope = Scope::OnlyDeleted;
        self
    }

    /// Deleted rows whose marker lies within `window` of `pivot`.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::NotParanoid`] for types without soft deletion.
    pub fn deleted_within_window(self, pivot: &FieldValue, window: Duration) -> Result<Self> {
        let predicate = ParanoidScope::new(self.paranoid()?).deleted_within_window(pivot, window);
        Ok(self.only_deleted().filter(predicate))
    }

    /// Rows deleted at or after `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::NotParanoid`] for types without soft deletion.
    pub fn deleted_after(self, at: DateTime<Utc>) -> Result<Self> {
        let predicate = ParanoidScope::new(self.paranoid()?).deleted_after(at);
        Ok(self.only_deleted().filter(predicate))
    }

    /// Rows deleted at or before `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::NotParanoid`] for types without soft deletion.
    pub fn deleted_before(self, at: DateTime<Utc>) -> Result<Self> {
        let predicate = ParanoidScope::new(self.paranoid()?).deleted_before(at);
        Ok(self.only_deleted().filter(predicate))
    }

    /// Add a condition, ANDed with the scope and any earlier filters.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = self.filter.and(predicate);
        self
    }

    /// The full predicate sent to storage.
    ///
    /// Types without soft deletion are unscoped, except that
    /// `only_deleted` matches nothing.
    #[must_use]
    pub fn predicate(&self) -> Predicate {
        let scope = match (&self.config, self.scope) {
            (Some(config), scope) => ParanoidScope::new(config).resolve(scope),
            (None, Scope::OnlyDeleted) => Predicate::Never,
            (None, Scope::Default | Scope::WithDeleted) => Predicate::Always,
        };
        scope.and(self.filter.clone())
    }

    /// Run the query.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::Storage`] if the read fails.
    pub async fn fetch(&self) -> Result<Vec<Record>> {
        let predicate = self.predicate();
        if predicate == Predicate::Never {
            return Ok(Vec::new());
        }
        let rows = self
            .engine
            .persistence
            .select(&self.record_type, &predicate)
            .await?;
        tracing::debug!(
            record_type = %self.record_type,
            %predicate,
            rows = rows.len(),
            "Fetched rows"
        );
        Ok(rows)
    }

    /// First matching row, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::Storage`] if the read fails.
    pub async fn first(&self) -> Result<Option<Record>> {
        Ok(self.fetch().await?.into_iter().next())
    }

    /// Number of matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::Storage`] if the read fails.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.fetch().await?.len())
    }

    /// Row `id` within the current scope.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::Storage`] if the read fails.
    pub async fn find(&self, id: RecordId) -> Result<Option<Record>> {
        self.clone().filter(Predicate::IdEq(id)).first().await
    }

    /// Row `id`, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::Storage`] if the read fails.
    pub async fn find_with_deleted(&self, id: RecordId) -> Result<Option<Record>> {
        self.clone().with_deleted().filter(Predicate::IdEq(id)).first().await
    }

    /// Soft-delete the listed rows that are not deleted yet, in one update.
    ///
    /// No callbacks run. Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// - [`ParanoidError::NotParanoid`] for types without soft deletion
    /// - [`ParanoidError::Storage`] if the update fails
    #[tracing::instrument(
        skip(self, ids),
        fields(record_type = %self.record_type, ids = ids.len())
    )]
    pub async fn delete(&self, ids: &[RecordId]) -> Result<u64> {
        let config = Arc::clone(self.paranoid()?);
        if ids.is_empty() {
            return Ok(0);
        }
        let now = self.engine.clock.now();
        let predicate =
            Predicate::IdIn(ids.to_vec()).and(ParanoidScope::new(&config).not_deleted());
        let assignments = config.deleted_assignments(now);

        let mut context = TxContext::begin(self.engine.persistence.as_ref()).await?;
        let outcome = async {
            let affected = context
                .tx()
                .update_where(&self.record_type, &predicate, &assignments)
                .await?;
            context.note(Transition::SoftDeleted, &self.record_type, affected);
            Ok::<_, ParanoidError>(affected)
        }
        .await;
        let affected = self.engine.finish(context, &self.record_type, outcome).await?;

        tracing::info!(affected, "Bulk soft delete");
        Ok(affected)
    }

    /// Permanently delete the listed rows, deleted or not.
    ///
    /// `has_many` dependents of each row are destroyed first, through their
    /// own lifecycle; the listed rows themselves are written in one update
    /// without callbacks. Rows that already are permanently deleted are
    /// skipped. Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// - [`ParanoidError::NotParanoid`] for types without soft deletion
    /// - [`ParanoidError::Callback`] if a dependent's callback fails
    /// - [`ParanoidError::Storage`] if the backend fails
    #[tracing::instrument(
        skip(self, ids),
        fields(record_type = %self.record_type, ids = ids.len())
    )]
    pub async fn delete_permanently(&self, ids: &[RecordId]) -> Result<u64> {
        let config = Arc::clone(self.paranoid()?);
        if ids.is_empty() {
            return Ok(0);
        }
        let now = self.engine.clock.now();
        let predicate = Predicate::IdIn(ids.to_vec()).and(Predicate::not_frozen());
        let assignments = config.deleted_assignments(now);

        let mut context = TxContext::begin(self.engine.persistence.as_ref()).await?;
        let outcome = async {
            let rows = context.tx().select(&self.record_type, &predicate).await?;
            for row in &rows {
                if let Some(id) = row.id() {
                    context.first_visit(&self.record_type, id);
                }
            }
            for row in &rows {
                self.engine
                    .hard_destroy_dependents(&mut context, row, now)
                    .await?;
            }
            let affected = context
                .tx()
                .update_where(&self.record_type, &predicate, &assignments)
                .await?;
            context
                .tx()
                .freeze_where(&self.record_type, &predicate)
                .await?;
            context.note(Transition::PermanentlyDeleted, &self.record_type, affected);
            Ok::<_, ParanoidError>(affected)
        }
        .await;
        let affected = self.engine.finish(context, &self.record_type, outcome).await?;

        tracing::info!(affected, "Bulk permanent delete");
        Ok(affected)
    }

    /// Recover the listed rows that are deleted, each through the lifecycle.
    ///
    /// Callbacks and cascades run as for a single recover. Permanently
    /// deleted rows are skipped. Returns the number of listed rows recovered.
    ///
    /// # Errors
    ///
    /// - [`ParanoidError::NotParanoid`] for types without soft deletion
    /// - [`ParanoidError::Callback`] if a recover callback fails
    /// - [`ParanoidError::Storage`] if the backend fails
    #[tracing::instrument(
        skip(self, ids, options),
        fields(record_type = %self.record_type, ids = ids.len())
    )]
    pub async fn recover(&self, ids: &[RecordId], options: RecoverOptions) -> Result<u64> {
        let config = Arc::clone(self.paranoid()?);
        if ids.is_empty() {
            return Ok(0);
        }
        let recovery = options.resolve(&config);
        let predicate = Predicate::IdIn(ids.to_vec())
            .and(ParanoidScope::new(&config).only_deleted())
            .and(Predicate::not_frozen());

        let mut context = TxContext::begin(self.engine.persistence.as_ref()).await?;
        let outcome = async {
            let rows = context.tx().select(&self.record_type, &predicate).await?;
            let mut recovered = 0;
            for mut row in rows {
                self.engine
                    .recover_within(&mut context, &mut row, recovery)
                    .await?;
                recovered += 1;
            }
            Ok::<_, ParanoidError>(recovered)
        }
        .await;
        let recovered = self.engine.finish(context, &self.record_type, outcome).await?;

        tracing::info!(recovered, "Bulk recover");
        Ok(recovered)
    }

    fn paranoid(&self) -> Result<&Arc<ParanoidConfiguration>> {
        self.config
            .as_ref()
            .ok_or_else(|| ParanoidError::NotParanoid(self.record_type.clone()))
    }
}
