//! Scoped reads, bulk operations and uniqueness validation.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

mod support;

use chrono::Duration;
use paranoia_core::callbacks::HookPoint;
use paranoia_core::environment::Clock;
use paranoia_core::error::ParanoidError;
use paranoia_core::predicate::Predicate;
use paranoia_core::value::FieldValue;
use paranoia_runtime::RecoverOptions;
use paranoia_testing::test_clock;
use support::{Harness, id_of};

#[tokio::test]
async fn bulk_delete_only_touches_listed_live_rows() {
    let h = Harness::new();
    let listed = h.post();
    let mut already_deleted = h.post();
    let untouched = h.post();

    h.engine.delete(&mut already_deleted).await.unwrap();
    let first_deletion = h.reload(&already_deleted).get("deleted_at").clone();
    h.advance_minutes(3);

    let affected = h
        .engine
        .model("Post")
        .unwrap()
        .delete(&[id_of(&listed), id_of(&already_deleted)])
        .await
        .unwrap();

    assert_eq!(affected, 1);
    assert!(h.is_deleted_in_store(&listed));
    assert!(!h.is_deleted_in_store(&untouched));
    assert_eq!(h.reload(&already_deleted).get("deleted_at"), &first_deletion);
    assert!(h.observer.events().is_empty());
    assert_eq!(h.store.stats().updates.len(), 2);
}

#[tokio::test]
async fn bulk_permanent_delete_cascades_per_row() {
    let h = Harness::new();
    let first = h.post();
    let second = h.post();
    let comment = h.comment(&first);

    let affected = h
        .engine
        .model("Post")
        .unwrap()
        .delete_permanently(&[id_of(&first), id_of(&second)])
        .await
        .unwrap();

    assert_eq!(affected, 2);
    assert!(h.is_deleted_in_store(&first));
    assert!(h.is_deleted_in_store(&second));
    assert!(h.is_deleted_in_store(&comment));

    let posts_with_callbacks = h
        .observer
        .events()
        .into_iter()
        .filter(|e| e.record.record_type() == "Post")
        .count();
    assert_eq!(posts_with_callbacks, 0);
    assert_eq!(h.observer.events_at(HookPoint::AfterDestroy).len(), 1);
}

#[tokio::test]
async fn bulk_recover_runs_the_lifecycle() {
    let h = Harness::new();
    let mut first = h.post();
    let mut second = h.post();
    let live = h.post();

    h.engine.delete(&mut first).await.unwrap();
    h.engine.delete(&mut second).await.unwrap();

    let recovered = h
        .engine
        .model("Post")
        .unwrap()
        .recover(
            &[id_of(&first), id_of(&second), id_of(&live)],
            RecoverOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(recovered, 2);
    assert_eq!(h.engine.model("Post").unwrap().count().await.unwrap(), 3);
    assert_eq!(h.observer.events_at(HookPoint::AfterRecover).len(), 2);
}

#[tokio::test]
async fn empty_id_lists_do_nothing() {
    let h = Harness::new();
    let query = h.engine.model("Post").unwrap();

    assert_eq!(query.delete(&[]).await.unwrap(), 0);
    assert_eq!(query.delete_permanently(&[]).await.unwrap(), 0);
    assert_eq!(h.store.stats().begins, 0);
}

#[tokio::test]
async fn find_respects_scope() {
    let h = Harness::new();
    let mut post = h.post();
    h.engine.delete(&mut post).await.unwrap();
    let query = h.engine.model("Post").unwrap();

    assert!(query.find(id_of(&post)).await.unwrap().is_none());
    assert_eq!(query.find_with_deleted(id_of(&post)).await.unwrap(), Some(post));
}

#[tokio::test]
async fn time_bounded_queries() {
    let h = Harness::new();
    let mut early = h.post();
    let mut late = h.post();
    let start = test_clock().now();

    h.engine.delete(&mut early).await.unwrap();
    h.advance_minutes(10);
    h.engine.delete(&mut late).await.unwrap();

    let query = h.engine.model("Post").unwrap();
    let near_start = query
        .clone()
        .deleted_within_window(&FieldValue::Time(start), Duration::minutes(2))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(near_start, vec![early.clone()]);

    let after = query
        .clone()
        .deleted_after(start + Duration::minutes(5))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(after, vec![late]);

    let before = query
        .deleted_before(start + Duration::minutes(5))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(before, vec![early]);
}

#[tokio::test]
async fn filters_combine_with_scope() {
    let h = Harness::new();
    let mut mine = h.insert("Post", &[("author_id", FieldValue::Int(7))]);
    h.insert("Post", &[("author_id", FieldValue::Int(8))]);
    h.insert("Post", &[("author_id", FieldValue::Int(7))]);
    h.engine.delete(&mut mine).await.unwrap();

    let by_author = h
        .engine
        .model("Post")
        .unwrap()
        .filter(Predicate::equals("author_id", 7_i64));

    assert_eq!(by_author.count().await.unwrap(), 1);
    assert_eq!(by_author.clone().with_deleted().count().await.unwrap(), 2);
    assert_eq!(by_author.only_deleted().first().await.unwrap(), Some(mine));
}

#[tokio::test]
async fn non_paranoid_types_are_unscoped() {
    let h = Harness::new();
    let tag = h.insert("Tag", &[("deleted_at", test_clock().now().into())]);
    let query = h.engine.model("Tag").unwrap();

    assert_eq!(query.fetch().await.unwrap(), vec![tag.clone()]);
    assert!(query.clone().only_deleted().fetch().await.unwrap().is_empty());
    assert!(matches!(
        query.delete(&[id_of(&tag)]).await,
        Err(ParanoidError::NotParanoid(_))
    ));
    assert!(matches!(
        query.deleted_after(test_clock().now()),
        Err(ParanoidError::NotParanoid(_))
    ));
}

#[tokio::test]
async fn unknown_types_cannot_be_queried() {
    let h = Harness::new();
    assert!(matches!(
        h.engine.model("Ghost"),
        Err(ParanoidError::UnknownRecordType(_))
    ));
}

#[tokio::test]
async fn uniqueness_ignores_deleted_rows() {
    let h = Harness::new();
    let mut original = h.insert("Author", &[("email", "ada@example.com".into())]);
    let candidate = h
        .engine
        .registry()
        .new_record("Author")
        .unwrap()
        .with_attribute("email", "ada@example.com");

    let error = h
        .engine
        .validate_uniqueness_without_deleted(&candidate, &["email"])
        .await
        .unwrap_err();
    assert!(matches!(error, ParanoidError::UniquenessViolation { .. }));

    h.engine
        .validate_uniqueness_without_deleted(&original, &["email"])
        .await
        .unwrap();

    h.engine.destroy(&mut original).await.unwrap();
    h.engine
        .validate_uniqueness_without_deleted(&candidate, &["email"])
        .await
        .unwrap();
}

#[tokio::test]
async fn bulk_operations_skip_permanently_deleted_rows() {
    let h = Harness::new();
    let post = h.post();
    let mut comment = h.comment(&post);

    h.engine.destroy_permanently(&mut comment).await.unwrap();
    let deleted_at = h.reload(&comment).get("deleted_at").clone();
    h.advance_minutes(3);
    let query = h.engine.model("Comment").unwrap();

    let recovered = query
        .recover(&[id_of(&comment)], RecoverOptions::default())
        .await
        .unwrap();
    assert_eq!(recovered, 0);
    let rewritten = query.delete_permanently(&[id_of(&comment)]).await.unwrap();
    assert_eq!(rewritten, 0);

    let stored = h.reload(&comment);
    assert!(stored.is_frozen());
    assert_eq!(stored.get("deleted_at"), &deleted_at);
    assert_eq!(query.with_deleted().count().await.unwrap(), 1);
}
