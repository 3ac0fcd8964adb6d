//! Shared blog fixture for engine tests.
//!
//! ```text
//! Post ─┬─ has_many comments (Comment.post_id, destroy)
//!       ├─ has_one  cover    (Image.post_id, destroy)
//!       ├─ has_many tags     (Tag.post_id, destroy)      Tag is not paranoid
//!       ├─ has_many views    (View.post_id, delete_all)
//!       └─ belongs_to author (Post.author_id, destroy)
//! Comment ── belongs_to post (Comment.post_id, destroy)   closes a cycle
//! Account: boolean `is_deleted` primary, time `deleted_at` secondary
//! ```

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use chrono::Duration;
use paranoia_core::association::{Association, DependentMode};
use paranoia_core::record::Record;
use paranoia_core::registry::{ModelDescriptor, Registry, RegistryBuilder};
use paranoia_core::value::{FieldValue, RecordId};
use paranoia_runtime::ParanoidEngine;
use paranoia_testing::{InMemoryStore, ManualClock, RecordingObserver, init_test_tracing};
use serde_json::json;
use std::sync::Arc;

pub const TYPES: [&str; 8] = [
    "Post", "Comment", "Image", "Tag", "View", "Author", "Account", "Setting",
];

/// Registry builder with the blog schema and no callbacks.
pub fn blog_builder() -> RegistryBuilder {
    let mut builder = Registry::builder();
    builder
        .register(
            ModelDescriptor::new("Post")
                .with_association(
                    Association::has_many("comments", "Comment", "post_id")
                        .dependent(DependentMode::Destroy),
                )
                .with_association(
                    Association::has_one("cover", "Image", "post_id")
                        .dependent(DependentMode::Destroy),
                )
                .with_association(
                    Association::has_many("tags", "Tag", "post_id")
                        .dependent(DependentMode::Destroy),
                )
                .with_association(
                    Association::has_many("views", "View", "post_id")
                        .dependent(DependentMode::DeleteAll),
                )
                .with_association(
                    Association::belongs_to("author", "Author", "author_id")
                        .dependent(DependentMode::Destroy),
                ),
        )
        .register(
            ModelDescriptor::new("Comment").with_association(
                Association::belongs_to("post", "Post", "post_id")
                    .dependent(DependentMode::Destroy),
            ),
        )
        .register(ModelDescriptor::new("Tag"))
        .register(ModelDescriptor::new("Setting"));

    for record_type in ["Post", "Comment", "Image", "View", "Author"] {
        builder.configure(record_type, &json!({})).unwrap();
    }
    builder
        .configure(
            "Account",
            &json!({
                "columns": [
                    { "column": "is_deleted", "column_type": "boolean" },
                    { "column": "deleted_at", "column_type": "time" }
                ]
            }),
        )
        .unwrap();
    builder
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub clock: ManualClock,
    pub observer: Arc<RecordingObserver>,
    pub engine: ParanoidEngine,
}

impl Harness {
    /// Blog schema with a recording observer on every type.
    pub fn new() -> Self {
        Self::with_builder(blog_builder())
    }

    pub fn with_builder(builder: RegistryBuilder) -> Self {
        Self::with_observer(builder, RecordingObserver::new())
    }

    pub fn with_observer(mut builder: RegistryBuilder, observer: RecordingObserver) -> Self {
        init_test_tracing();
        let observer = Arc::new(observer);
        for record_type in TYPES {
            builder.observe(record_type, observer.clone());
        }
        let store = Arc::new(InMemoryStore::new());
        let clock = ManualClock::default();
        let engine = ParanoidEngine::new(Arc::new(builder.build()), store.clone())
            .with_clock(Arc::new(clock.clone()));
        Self {
            store,
            clock,
            observer,
            engine,
        }
    }

    /// Insert a fresh record of `record_type` with `attributes`.
    pub fn insert(&self, record_type: &str, attributes: &[(&str, FieldValue)]) -> Record {
        let mut record = self.engine.registry().new_record(record_type).unwrap();
        for (column, value) in attributes {
            record.set(*column, value.clone());
        }
        self.store.insert(record)
    }

    pub fn post(&self) -> Record {
        self.insert("Post", &[("title", "hello".into())])
    }

    pub fn comment(&self, post: &Record) -> Record {
        self.insert("Comment", &[("post_id", id_of(post).into())])
    }

    /// Committed state of `record`.
    pub fn reload(&self, record: &Record) -> Record {
        self.store
            .get(record.record_type(), id_of(record))
            .expect("row exists")
    }

    pub fn is_deleted_in_store(&self, record: &Record) -> bool {
        self.engine.is_deleted(&self.reload(record))
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }
}

pub fn id_of(record: &Record) -> RecordId {
    record.id().expect("record has an id")
}
