//! Blog schema used by the demo.
//!
//! Posts own comments and attachments. Comments are soft-deleted through a
//! timestamp; attachments flag deletion with a boolean and also stamp the
//! time in a secondary column.

use paranoia_core::association::{Association, DependentMode};
use paranoia_core::callbacks::{HookError, LifecycleEvent, LifecycleObserver};
use paranoia_core::error::ConfigurationError;
use paranoia_core::registry::{ModelDescriptor, Registry};
use serde_json::json;
use std::sync::Arc;

/// Observer that logs every lifecycle event.
#[derive(Debug, Default)]
pub struct AuditLog;

impl LifecycleObserver for AuditLog {
    fn on_event(&self, event: &LifecycleEvent<'_>) -> Result<(), HookError> {
        tracing::info!(
            point = %event.point,
            record_type = event.record.record_type(),
            id = ?event.record.id(),
            "audit"
        );
        Ok(())
    }
}

/// Build the blog registry.
///
/// # Errors
///
/// Returns [`ConfigurationError`] if any type's options are rejected.
pub fn blog_registry() -> Result<Registry, ConfigurationError> {
    let audit: Arc<dyn LifecycleObserver> = Arc::new(AuditLog);
    let mut builder = Registry::builder();

    builder
        .register(
            ModelDescriptor::new("Post")
                .with_association(
                    Association::has_many("comments", "Comment", "post_id")
                        .dependent(DependentMode::Destroy),
                )
                .with_association(
                    Association::has_many("attachments", "Attachment", "post_id")
                        .dependent(DependentMode::Destroy),
                ),
        )
        .configure("Post", &json!({}))?
        .configure("Comment", &json!({ "dependent_recovery_window": 120 }))?
        .configure(
            "Attachment",
            &json!({
                "columns": [
                    { "column": "is_deleted", "column_type": "boolean" },
                    { "column": "deleted_at", "column_type": "time" }
                ]
            }),
        )?
        .before_recover("Post", |post| {
            tracing::debug!(id = ?post.id(), "Recovering post");
            Ok(())
        })?;

    for record_type in ["Post", "Comment", "Attachment"] {
        builder.observe(record_type, Arc::clone(&audit));
    }
    Ok(builder.build())
}
