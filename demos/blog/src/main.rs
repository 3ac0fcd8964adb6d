//! Blog demo: soft delete, cascading permanent delete and windowed recovery.
//!
//! Run with `RUST_LOG=debug` to see every step of the engine.

use anyhow::Context;
use blog_demo::blog_registry;
use chrono::Duration;
use paranoia_core::record::Record;
use paranoia_core::value::FieldValue;
use paranoia_runtime::{ParanoidEngine, RecoverOptions};
use paranoia_testing::{InMemoryStore, ManualClock};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn id_value(record: &Record) -> anyhow::Result<FieldValue> {
    record
        .id()
        .map(FieldValue::from)
        .context("record was never saved")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    paranoia_runtime::metrics::describe_metrics();

    println!("=== Paranoid Blog Demo ===\n");

    let registry = Arc::new(blog_registry()?);
    let store = Arc::new(InMemoryStore::new());
    let clock = ManualClock::default();
    let engine = ParanoidEngine::new(Arc::clone(&registry), store.clone())
        .with_clock(Arc::new(clock.clone()));

    let mut post = store.insert(
        registry
            .new_record("Post")?
            .with_attribute("title", "Soft deletes in practice"),
    );
    let post_id = id_value(&post)?;
    let mut early = store.insert(
        registry
            .new_record("Comment")?
            .with_attribute("post_id", post_id.clone())
            .with_attribute("body", "Great post"),
    );
    let mut late = store.insert(
        registry
            .new_record("Comment")?
            .with_attribute("post_id", post_id.clone())
            .with_attribute("body", "Spam"),
    );
    let attachment = store.insert(
        registry
            .new_record("Attachment")?
            .with_attribute("post_id", post_id),
    );

    println!("Soft-deleting the post, then its comments...");
    engine.destroy(&mut post).await?;
    clock.advance(Duration::minutes(1));
    engine.destroy(&mut early).await?;
    clock.advance(Duration::minutes(10));
    engine.destroy(&mut late).await?;

    let comments = engine.model("Comment")?;
    println!("  visible comments: {}", comments.count().await?);
    println!("  deleted comments: {}", comments.clone().only_deleted().count().await?);

    println!("\nRecovering the post with its dependents (2 minute window)...");
    engine.recover(&mut post, RecoverOptions::default()).await?;
    for comment in comments.with_deleted().fetch().await? {
        println!(
            "  comment {:?} deleted: {}",
            comment.get("body"),
            engine.is_deleted(&comment)
        );
    }

    println!("\nPermanently deleting the post...");
    engine.destroy_permanently(&mut post).await?;
    let attachment = store
        .get("Attachment", attachment.id().context("attachment id")?)
        .context("attachment row")?;
    println!(
        "  post frozen: {}, attachment is_deleted: {}, deleted_at: {}",
        engine.is_permanently_deleted(&post),
        attachment.get("is_deleted"),
        attachment.get("deleted_at"),
    );

    match engine.recover(&mut post, RecoverOptions::default()).await {
        Ok(()) => println!("  unexpected: recovered a frozen post"),
        Err(error) => println!("  recover refused: {error}"),
    }

    let stats = store.stats();
    println!(
        "\nStore: {} commits, {} rollbacks, {} updates",
        stats.commits,
        stats.rollbacks,
        stats.updates.len()
    );
    Ok(())
}
