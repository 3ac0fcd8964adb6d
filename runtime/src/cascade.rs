//! Cascade resolver.
//!
//! Walks the dependent associations of a record, in declaration order, and
//! re-enters the lifecycle for each related row inside the caller's
//! transaction context. Targets that are not paranoid are skipped.
//!
//! - **Hard destroy**: `has_many` associations tagged `dependent: destroy`.
//!   Every child, deleted or not, is destroyed permanently. Children that
//!   already are permanently deleted are left alone.
//! - **Recovery**: every dependent association. Only children whose
//!   deletion marker lies within the recovery window of the parent's are
//!   recovered, so rows deleted independently stay deleted. Permanently
//!   deleted children are never matched.

use crate::ParanoidEngine;
use crate::context::TxContext;
use crate::lifecycle::{LifecycleFuture, Recovery, Removal};
use chrono::{DateTime, Utc};
use paranoia_core::association::{AssociationKind, DependentMode};
use paranoia_core::predicate::Predicate;
use paranoia_core::record::Record;
use paranoia_core::scope::ParanoidScope;
use paranoia_core::value::FieldValue;

impl ParanoidEngine {
    /// Permanently destroy the `has_many` dependents of `owner`.
    pub(crate) fn hard_destroy_dependents<'a>(
        &'a self,
        context: &'a mut TxContext,
        owner: &'a Record,
        now: DateTime<Utc>,
    ) -> LifecycleFuture<'a> {
        Box::pin(async move {
            let (Some(model), Some(owner_id)) =
                (self.registry.model(owner.record_type()), owner.id())
            else {
                return Ok(());
            };

            for association in model.dependent_associations() {
                if association.dependent_mode() != DependentMode::Destroy
                    || association.kind() != AssociationKind::HasMany
                    || !self.registry.is_paranoid(association.target())
                {
                    continue;
                }

                let predicate = Predicate::equals(association.foreign_key(), owner_id)
                    .and(Predicate::not_frozen());
                let children = context
                    .tx()
                    .select(association.target(), &predicate)
                    .await?;
                tracing::debug!(
                    owner = owner.record_type(),
                    %owner_id,
                    association = association.name(),
                    children = children.len(),
                    "Destroying dependents"
                );

                for mut child in children {
                    self.remove_within(context, &mut child, Removal::destroy(true), now)
                        .await?;
                }
            }
            Ok(())
        })
    }

    /// Recover the dependents of `owner` deleted within the window around `pivot`.
    pub(crate) fn recover_dependents<'a>(
        &'a self,
        context: &'a mut TxContext,
        owner: &'a Record,
        pivot: &'a FieldValue,
        recovery: Recovery,
    ) -> LifecycleFuture<'a> {
        Box::pin(async move {
            let (Some(model), Some(owner_id)) =
                (self.registry.model(owner.record_type()), owner.id())
            else {
                return Ok(());
            };

            for association in model.dependent_associations() {
                let Some(target) = self.registry.paranoid_config(association.target()) else {
                    continue;
                };
                let window =
                    ParanoidScope::new(target).deleted_within_window(pivot, recovery.window);

                let lookup = match association.kind() {
                    AssociationKind::HasMany | AssociationKind::HasOne => {
                        Predicate::equals(association.foreign_key(), owner_id)
                    }
                    AssociationKind::BelongsTo => {
                        match owner.get(association.foreign_key()).as_record_id() {
                            Some(target_id) => Predicate::IdEq(target_id),
                            None => continue,
                        }
                    }
                };

                let mut matches = context
                    .tx()
                    .select(
                        association.target(),
                        &lookup.and(window).and(Predicate::not_frozen()),
                    )
                    .await?;
                if association.kind() != AssociationKind::HasMany {
                    matches.truncate(1);
                }
                tracing::debug!(
                    owner = owner.record_type(),
                    %owner_id,
                    association = association.name(),
                    matches = matches.len(),
                    "Recovering dependents"
                );

                for mut child in matches {
                    self.recover_within(context, &mut child, recovery).await?;
                }
            }
            Ok(())
        })
    }
}
