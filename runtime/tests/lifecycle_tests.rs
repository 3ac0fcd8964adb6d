//! Lifecycle state machine tests: soft delete, escalation, freeze, recover.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

mod support;

use paranoia_core::column::ParanoidColumnConfig;
use paranoia_core::config::ParanoidConfiguration;
use paranoia_core::environment::Clock;
use paranoia_core::error::ParanoidError;
use paranoia_core::record::{PersistenceState, Record};
use paranoia_core::value::FieldValue;
use paranoia_runtime::RecoverOptions;
use paranoia_testing::test_clock;
use support::{Harness, blog_builder, id_of};

#[tokio::test]
async fn fresh_records_are_live_and_visible() {
    let h = Harness::new();
    let post = h.post();

    assert!(!h.engine.is_deleted(&post));
    let visible = h.engine.model("Post").unwrap().fetch().await.unwrap();
    assert_eq!(visible, vec![post]);
}

#[tokio::test]
async fn destroy_hides_record_from_default_scope() {
    let h = Harness::new();
    let mut post = h.post();

    h.engine.destroy(&mut post).await.unwrap();

    assert!(h.engine.is_deleted(&post));
    assert_eq!(post.get("deleted_at"), &FieldValue::Time(test_clock().now()));
    assert_eq!(post.state(), PersistenceState::Persisted);

    let query = h.engine.model("Post").unwrap();
    assert_eq!(query.count().await.unwrap(), 0);
    assert_eq!(query.clone().with_deleted().count().await.unwrap(), 1);
    assert_eq!(query.only_deleted().count().await.unwrap(), 1);
    assert!(h.is_deleted_in_store(&post));
}

#[tokio::test]
async fn delete_then_recover_restores_visibility() {
    let h = Harness::new();
    let mut post = h.post();

    h.engine.delete(&mut post).await.unwrap();
    h.engine
        .recover(&mut post, RecoverOptions::default())
        .await
        .unwrap();

    assert!(!h.engine.is_deleted(&post));
    assert!(!h.is_deleted_in_store(&post));
    assert_eq!(h.engine.model("Post").unwrap().count().await.unwrap(), 1);
}

#[tokio::test]
async fn recover_leaves_secondary_columns_as_written() {
    let h = Harness::new();
    let mut account = h.insert("Account", &[]);

    h.engine.delete(&mut account).await.unwrap();
    assert_eq!(account.get("is_deleted"), &FieldValue::Bool(true));
    assert_eq!(account.get("deleted_at"), &FieldValue::Time(test_clock().now()));

    h.engine
        .recover(&mut account, RecoverOptions::default())
        .await
        .unwrap();

    let stored = h.reload(&account);
    assert_eq!(stored.get("is_deleted"), &FieldValue::Bool(false));
    assert_eq!(stored.get("deleted_at"), &FieldValue::Time(test_clock().now()));
    assert!(!h.engine.is_deleted(&stored));
}

#[tokio::test]
async fn second_soft_delete_escalates_to_permanent() {
    let h = Harness::new();
    let mut post = h.post();

    h.engine.delete(&mut post).await.unwrap();
    assert!(!h.engine.is_permanently_deleted(&post));

    h.engine.delete(&mut post).await.unwrap();
    assert!(h.engine.is_permanently_deleted(&post));

    let error = h
        .engine
        .recover(&mut post, RecoverOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, ParanoidError::InvalidState { .. }));
    assert!(h.is_deleted_in_store(&post));
}

#[tokio::test]
async fn escalation_can_be_disabled() {
    let mut builder = blog_builder();
    builder.configure_with(
        "Draft",
        ParanoidConfiguration::new(
            ParanoidColumnConfig::time("deleted_at").with_double_tap_destroys_fully(false),
        ),
    );
    let h = Harness::with_builder(builder);
    let mut draft = h.insert("Draft", &[]);

    h.engine.destroy(&mut draft).await.unwrap();
    let first = draft.get("deleted_at").clone();
    h.advance_minutes(1);
    h.engine.destroy(&mut draft).await.unwrap();

    assert!(!draft.is_frozen());
    assert_eq!(draft.get("deleted_at"), &first);
    assert_eq!(h.store.stats().commits, 1);
}

#[tokio::test]
async fn frozen_records_ignore_further_deletes() {
    let h = Harness::new();
    let mut post = h.post();

    h.engine.destroy_permanently(&mut post).await.unwrap();
    let commits = h.store.stats().commits;

    h.engine.destroy(&mut post).await.unwrap();
    h.engine.delete_permanently(&mut post).await.unwrap();

    assert!(post.is_frozen());
    assert_eq!(h.store.stats().commits, commits);
    assert_eq!(h.store.stats().begins, commits);
}

#[tokio::test]
async fn unsaved_records_are_marked_in_memory_only() {
    let h = Harness::new();
    let mut post = h.engine.registry().new_record("Post").unwrap();

    h.engine.destroy(&mut post).await.unwrap();
    assert!(h.engine.is_deleted(&post));
    assert!(!post.is_frozen());

    h.engine.destroy_permanently(&mut post).await.unwrap();
    assert!(post.is_frozen());

    assert!(h.store.rows("Post").is_empty());
    assert_eq!(h.store.stats().begins, 0);
    assert!(h.observer.events().is_empty());
}

#[tokio::test]
async fn recover_requires_identity() {
    let h = Harness::new();
    let mut post = h.engine.registry().new_record("Post").unwrap();
    h.engine.delete(&mut post).await.unwrap();

    let error = h
        .engine
        .recover(&mut post, RecoverOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, ParanoidError::InvalidState { id: None, .. }));
}

#[tokio::test]
async fn permanent_delete_writes_every_column_in_one_update() {
    let h = Harness::new();
    let mut account = h.insert("Account", &[]);

    h.engine.delete_permanently(&mut account).await.unwrap();

    let updates = h.store.stats().updates;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].columns, vec!["is_deleted", "deleted_at"]);
    assert_eq!(updates[0].affected, 1);

    let stored = h.reload(&account);
    assert_eq!(stored.get("is_deleted"), &FieldValue::Bool(true));
    assert_eq!(stored.get("deleted_at"), &FieldValue::Time(test_clock().now()));
    assert!(account.is_frozen());
}

#[tokio::test]
async fn deleted_state_follows_primary_column() {
    let h = Harness::new();
    let account = h.insert("Account", &[("deleted_at", test_clock().now().into())]);

    assert!(!h.engine.is_deleted(&account));
    assert_eq!(h.engine.model("Account").unwrap().count().await.unwrap(), 1);
}

#[tokio::test]
async fn non_paranoid_types_refuse_lifecycle_operations() {
    let h = Harness::new();
    let mut tag = h.insert("Tag", &[]);

    let error = h.engine.destroy(&mut tag).await.unwrap_err();
    assert!(matches!(error, ParanoidError::NotParanoid(ref t) if t == "Tag"));
    assert!(!h.engine.is_deleted(&tag));
}

#[tokio::test]
async fn unknown_types_are_reported() {
    let h = Harness::new();
    let mut ghost = Record::persisted("Ghost", paranoia_core::value::RecordId::new(1));

    let error = h.engine.delete(&mut ghost).await.unwrap_err();
    assert!(matches!(error, ParanoidError::UnknownRecordType(_)));
}

#[tokio::test]
async fn failed_commit_leaves_instance_untouched() {
    let h = Harness::new();
    let mut post = h.post();
    let before = post.clone();

    h.store.fail_next_commit();
    let error = h.engine.destroy(&mut post).await.unwrap_err();

    assert!(matches!(error, ParanoidError::Storage(_)));
    assert_eq!(post, before);
    assert!(!h.is_deleted_in_store(&post));
}

#[tokio::test]
async fn recovering_a_live_record_is_harmless() {
    let h = Harness::new();
    let mut post = h.post();

    h.engine
        .recover(&mut post, RecoverOptions::default())
        .await
        .unwrap();

    assert!(!h.engine.is_deleted(&post));
    assert_eq!(h.reload(&post), post);
    assert_eq!(id_of(&post), id_of(&h.reload(&post)));
}

#[tokio::test]
async fn permanent_delete_is_stored_with_the_row() {
    let h = Harness::new();
    let mut post = h.post();
    let mut stale = post.clone();

    h.engine.delete(&mut post).await.unwrap();
    h.engine.delete(&mut post).await.unwrap();

    let mut loaded = h
        .engine
        .model("Post")
        .unwrap()
        .find_with_deleted(id_of(&post))
        .await
        .unwrap()
        .unwrap();
    assert!(h.engine.is_permanently_deleted(&loaded));

    let error = h
        .engine
        .recover(&mut loaded, RecoverOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, ParanoidError::InvalidState { .. }));

    let error = h
        .engine
        .recover(&mut stale, RecoverOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, ParanoidError::Storage(_)));
    assert!(h.reload(&post).is_frozen());
    assert!(h.is_deleted_in_store(&post));
}
