//! In-memory persistence with real transaction semantics
//!
//! [`InMemoryStore`] keeps one table per record type. Each transaction works
//! on a private snapshot; commit copies the rows it wrote back into the
//! store, rollback throws the snapshot away. Failures can be injected per
//! record type to exercise rollback paths.
//!
//! Frozen rows keep their state: they are returned frozen, updates skip
//! them and saves are rejected.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use paranoia_core::persistence::{
    Assignment, Persistence, StorageError, StorageFuture, Transaction,
};
use paranoia_core::predicate::Predicate;
use paranoia_core::record::Record;
use paranoia_core::value::RecordId;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

type Tables = BTreeMap<String, BTreeMap<RecordId, Record>>;

/// One `update_where` call, as seen by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateLog {
    /// Record type updated.
    pub record_type: String,
    /// Rendered predicate.
    pub predicate: String,
    /// Columns written, in assignment order.
    pub columns: Vec<String>,
    /// Rows affected.
    pub affected: u64,
}

/// Counters for assertions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Transactions opened.
    pub begins: usize,
    /// Transactions committed.
    pub commits: usize,
    /// Transactions rolled back.
    pub rollbacks: usize,
    /// Committed updates, in order.
    pub updates: Vec<UpdateLog>,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: Tables,
    next_id: i64,
    failing_updates: HashSet<String>,
    failing_saves: HashSet<String>,
    fail_next_commit: bool,
    stats: StoreStats,
}

/// In-memory [`Persistence`] implementation for tests.
///
/// # Example
///
/// ```
/// use paranoia_core::persistence::Persistence;
/// use paranoia_core::predicate::Predicate;
/// use paranoia_core::record::Record;
/// use paranoia_testing::InMemoryStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let post = store.insert(Record::new("Post").with_attribute("title", "hello"));
/// assert!(post.id().is_some());
///
/// let rows = store.select("Post", &Predicate::Always).await.unwrap();
/// assert_eq!(rows.len(), 1);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, assigning an id to new records.
    ///
    /// Returns the stored record.
    pub fn insert(&self, mut record: Record) -> Record {
        let mut state = self.state.lock().unwrap();
        let id = if let Some(id) = record.id() {
            state.next_id = state.next_id.max(id.get());
            id
        } else {
            state.next_id += 1;
            RecordId::new(state.next_id)
        };
        record.mark_persisted(id);
        let stored = normalize(&record, id);
        state
            .tables
            .entry(record.record_type().to_string())
            .or_default()
            .insert(id, stored.clone());
        stored
    }

    /// Committed row `id` of `record_type`
    #[must_use]
    pub fn get(&self, record_type: &str, id: RecordId) -> Option<Record> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(record_type)
            .and_then(|table| table.get(&id))
            .cloned()
    }

    /// Every committed row of `record_type`, ordered by id
    #[must_use]
    pub fn rows(&self, record_type: &str) -> Vec<Record> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(record_type)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every `update_where` on `record_type` fail
    pub fn fail_updates_on(&self, record_type: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_updates
            .insert(record_type.to_string());
    }

    /// Make every `save` of a `record_type` row fail
    pub fn fail_saves_on(&self, record_type: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_saves
            .insert(record_type.to_string());
    }

    /// Make the next commit fail
    pub fn fail_next_commit(&self) {
        self.state.lock().unwrap().fail_next_commit = true;
    }

    /// Remove every injected failure
    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_updates.clear();
        state.failing_saves.clear();
        state.fail_next_commit = false;
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.state.lock().unwrap().stats.clone()
    }
}

impl Persistence for InMemoryStore {
    fn select<'a>(
        &'a self,
        record_type: &'a str,
        predicate: &'a Predicate,
    ) -> StorageFuture<'a, Vec<Record>> {
        let rows = {
            let state = self.state.lock().unwrap();
            matching(&state.tables, record_type, predicate)
        };
        Box::pin(std::future::ready(Ok(rows)))
    }

    fn begin(&self) -> StorageFuture<'_, Box<dyn Transaction>> {
        let transaction = {
            let mut state = self.state.lock().unwrap();
            state.stats.begins += 1;
            MemoryTransaction {
                store: Arc::clone(&self.state),
                tables: state.tables.clone(),
                failing_updates: state.failing_updates.clone(),
                failing_saves: state.failing_saves.clone(),
                written: BTreeSet::new(),
                updates: Vec::new(),
            }
        };
        Box::pin(std::future::ready(Ok(
            Box::new(transaction) as Box<dyn Transaction>
        )))
    }
}

struct MemoryTransaction {
    store: Arc<Mutex<StoreState>>,
    tables: Tables,
    failing_updates: HashSet<String>,
    failing_saves: HashSet<String>,
    written: BTreeSet<(String, RecordId)>,
    updates: Vec<UpdateLog>,
}

impl MemoryTransaction {
    fn update(
        &mut self,
        record_type: &str,
        predicate: &Predicate,
        assignments: &[Assignment],
    ) -> Result<u64, StorageError> {
        if self.failing_updates.contains(record_type) {
            return Err(StorageError::Database(format!(
                "injected update failure on {record_type}"
            )));
        }

        let mut affected = 0;
        if let Some(table) = self.tables.get_mut(record_type) {
            for (id, row) in table.iter_mut() {
                if !row.is_frozen() && predicate.matches(row) {
                    for assignment in assignments {
                        assignment.apply(row);
                    }
                    self.written.insert((record_type.to_string(), *id));
                    affected += 1;
                }
            }
        }

        self.updates.push(UpdateLog {
            record_type: record_type.to_string(),
            predicate: predicate.to_string(),
            columns: assignments.iter().map(|a| a.column.clone()).collect(),
            affected,
        });
        Ok(affected)
    }

    fn freeze(&mut self, record_type: &str, predicate: &Predicate) -> Result<u64, StorageError> {
        if self.failing_updates.contains(record_type) {
            return Err(StorageError::Database(format!(
                "injected update failure on {record_type}"
            )));
        }

        let mut frozen = 0;
        if let Some(table) = self.tables.get_mut(record_type) {
            for (id, row) in table.iter_mut() {
                if !row.is_frozen() && predicate.matches(row) {
                    row.freeze();
                    self.written.insert((record_type.to_string(), *id));
                    frozen += 1;
                }
            }
        }
        Ok(frozen)
    }

    fn store_row(&mut self, record: &Record) -> Result<(), StorageError> {
        let record_type = record.record_type();
        if self.failing_saves.contains(record_type) {
            return Err(StorageError::Database(format!(
                "injected save failure on {record_type}"
            )));
        }
        let id = record.id().ok_or_else(|| {
            StorageError::Other(format!("cannot save {record_type} without an id"))
        })?;
        let row = self
            .tables
            .get_mut(record_type)
            .and_then(|table| table.get_mut(&id))
            .ok_or_else(|| StorageError::RowNotFound {
                record_type: record_type.to_string(),
                id: id.to_string(),
            })?;
        if row.is_frozen() {
            return Err(StorageError::Conflict(format!(
                "{record_type} {id} is permanently deleted"
            )));
        }
        *row = normalize(record, id);
        self.written.insert((record_type.to_string(), id));
        Ok(())
    }
}

impl Transaction for MemoryTransaction {
    fn select<'a>(
        &'a mut self,
        record_type: &'a str,
        predicate: &'a Predicate,
    ) -> StorageFuture<'a, Vec<Record>> {
        let rows = matching(&self.tables, record_type, predicate);
        Box::pin(std::future::ready(Ok(rows)))
    }

    fn update_where<'a>(
        &'a mut self,
        record_type: &'a str,
        predicate: &'a Predicate,
        assignments: &'a [Assignment],
    ) -> StorageFuture<'a, u64> {
        let result = self.update(record_type, predicate, assignments);
        Box::pin(std::future::ready(result))
    }

    fn freeze_where<'a>(
        &'a mut self,
        record_type: &'a str,
        predicate: &'a Predicate,
    ) -> StorageFuture<'a, u64> {
        let result = self.freeze(record_type, predicate);
        Box::pin(std::future::ready(result))
    }

    fn save<'a>(&'a mut self, record: &'a Record) -> StorageFuture<'a, ()> {
        let result = self.store_row(record);
        Box::pin(std::future::ready(result))
    }

    fn commit(self: Box<Self>) -> StorageFuture<'static, ()> {
        let this = *self;
        let result = {
            let mut state = this.store.lock().unwrap();
            if state.fail_next_commit {
                state.fail_next_commit = false;
                state.stats.rollbacks += 1;
                Err(StorageError::Conflict("injected commit failure".to_string()))
            } else {
                for (record_type, id) in &this.written {
                    if let Some(row) = this.tables.get(record_type).and_then(|t| t.get(id)) {
                        state
                            .tables
                            .entry(record_type.clone())
                            .or_default()
                            .insert(*id, row.clone());
                    }
                }
                state.stats.commits += 1;
                state.stats.updates.extend(this.updates);
                Ok(())
            }
        };
        Box::pin(std::future::ready(result))
    }

    fn rollback(self: Box<Self>) -> StorageFuture<'static, ()> {
        self.store.lock().unwrap().stats.rollbacks += 1;
        Box::pin(std::future::ready(Ok(())))
    }
}

fn matching(tables: &Tables, record_type: &str, predicate: &Predicate) -> Vec<Record> {
    tables
        .get(record_type)
        .map(|table| {
            table
                .values()
                .filter(|row| predicate.matches(row))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Rows are stored `Persisted`, or `Frozen` when the record already is.
fn normalize(record: &Record, id: RecordId) -> Record {
    let mut row = record
        .attributes()
        .iter()
        .fold(Record::persisted(record.record_type(), id), |row, (column, value)| {
            row.with_attribute(column.clone(), value.clone())
        });
    if record.is_frozen() {
        row.freeze();
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use paranoia_core::value::FieldValue;

    #[tokio::test]
    async fn uncommitted_writes_stay_private() {
        let store = InMemoryStore::new();
        let post = store.insert(Record::new("Post"));
        let id = post.id().unwrap();

        let mut tx = store.begin().await.unwrap();
        let assignments = [Assignment::new("deleted_at", FieldValue::Int(1))];
        let affected = tx
            .update_where("Post", &Predicate::IdEq(id), &assignments)
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert!(store.get("Post", id).unwrap().get("deleted_at").is_null());

        tx.rollback().await.unwrap();
        assert!(store.get("Post", id).unwrap().get("deleted_at").is_null());
        assert_eq!(store.stats().rollbacks, 1);
    }

    #[tokio::test]
    async fn commit_publishes_written_rows() {
        let store = InMemoryStore::new();
        let post = store.insert(Record::new("Post"));
        let id = post.id().unwrap();

        let mut tx = store.begin().await.unwrap();
        let assignments = [Assignment::new("deleted_at", FieldValue::Int(1))];
        tx.update_where("Post", &Predicate::Always, &assignments)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get("Post", id).unwrap().get("deleted_at"), &FieldValue::Int(1));
        let stats = store.stats();
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.updates[0].columns, vec!["deleted_at".to_string()]);
    }

    #[tokio::test]
    async fn save_requires_existing_row() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let ghost = Record::persisted("Post", RecordId::new(42));
        let error = tx.save(&ghost).await.unwrap_err();
        assert!(matches!(error, StorageError::RowNotFound { .. }));
    }

    #[tokio::test]
    async fn frozen_rows_are_immutable() {
        let store = InMemoryStore::new();
        let post = store.insert(Record::new("Post"));
        let id = post.id().unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.freeze_where("Post", &Predicate::IdEq(id)).await.unwrap(), 1);
        assert_eq!(tx.freeze_where("Post", &Predicate::IdEq(id)).await.unwrap(), 0);
        let assignments = [Assignment::new("deleted_at", FieldValue::Int(1))];
        let affected = tx
            .update_where("Post", &Predicate::Always, &assignments)
            .await
            .unwrap();
        assert_eq!(affected, 0);
        let error = tx.save(&post).await.unwrap_err();
        assert!(matches!(error, StorageError::Conflict(_)));
        tx.commit().await.unwrap();

        let stored = store.get("Post", id).unwrap();
        assert!(stored.is_frozen());
        assert!(stored.get("deleted_at").is_null());
    }

    #[test]
    fn insert_keeps_explicit_ids_and_advances_sequence() {
        let store = InMemoryStore::new();
        store.insert(Record::persisted("Post", RecordId::new(10)));
        let next = store.insert(Record::new("Post"));
        assert_eq!(next.id(), Some(RecordId::new(11)));
    }
}
