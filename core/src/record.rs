//! Dynamic records and their persistence state.

use crate::value::{FieldValue, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static NULL: FieldValue = FieldValue::Null;

/// Where a record instance stands relative to storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistenceState {
    /// Never persisted; the record has no identity.
    New,
    /// Loaded from, or written to, storage.
    Persisted,
    /// Permanently deleted. Terminal: lifecycle mutations are refused.
    Frozen,
}

/// A persisted (or to-be-persisted) entity of some record type.
///
/// Attributes are kept in a sorted map so that debug output and comparisons
/// are deterministic. Reading an attribute that was never set yields
/// [`FieldValue::Null`].
///
/// # Examples
///
/// ```
/// use paranoia_core::record::{PersistenceState, Record};
/// use paranoia_core::value::{FieldValue, RecordId};
///
/// let post = Record::persisted("Post", RecordId::new(1)).with_attribute("title", "hello");
/// assert_eq!(post.state(), PersistenceState::Persisted);
/// assert_eq!(post.get("title"), &FieldValue::from("hello"));
/// assert!(post.get("missing").is_null());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    record_type: String,
    id: Option<RecordId>,
    attributes: BTreeMap<String, FieldValue>,
    state: PersistenceState,
}

impl Record {
    /// Create a new, never-persisted record.
    #[must_use]
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: None,
            attributes: BTreeMap::new(),
            state: PersistenceState::New,
        }
    }

    /// Create a record that already exists in storage under `id`.
    #[must_use]
    pub fn persisted(record_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            record_type: record_type.into(),
            id: Some(id),
            attributes: BTreeMap::new(),
            state: PersistenceState::Persisted,
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(
        mut self,
        column: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.set(column, value);
        self
    }

    /// Name of the record type this record belongs to.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Primary key, if the record has been persisted.
    #[must_use]
    pub const fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Current persistence state.
    #[must_use]
    pub const fn state(&self) -> PersistenceState {
        self.state
    }

    /// Read an attribute, defaulting to `Null`.
    #[must_use]
    pub fn get(&self, column: &str) -> &FieldValue {
        self.attributes.get(column).unwrap_or(&NULL)
    }

    /// Set an attribute.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.attributes.insert(column.into(), value.into());
    }

    /// All attributes in column order.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, FieldValue> {
        &self.attributes
    }

    /// `true` when the record has never been persisted.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.state == PersistenceState::New
    }

    /// `true` once the record has been permanently deleted.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state == PersistenceState::Frozen
    }

    /// Assign an identity after the storage layer inserted the row.
    ///
    /// Has no effect on a frozen record.
    pub fn mark_persisted(&mut self, id: RecordId) {
        if !self.is_frozen() {
            self.id = Some(id);
            self.state = PersistenceState::Persisted;
        }
    }

    /// Move the record into its terminal state.
    pub fn freeze(&mut self) {
        self.state = PersistenceState::Frozen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_have_no_identity() {
        let record = Record::new("Post");
        assert!(record.is_new());
        assert_eq!(record.id(), None);
    }

    #[test]
    fn mark_persisted_assigns_identity() {
        let mut record = Record::new("Post");
        record.mark_persisted(RecordId::new(3));
        assert_eq!(record.id(), Some(RecordId::new(3)));
        assert_eq!(record.state(), PersistenceState::Persisted);
    }

    #[test]
    fn frozen_records_stay_frozen() {
        let mut record = Record::persisted("Post", RecordId::new(1));
        record.freeze();
        record.mark_persisted(RecordId::new(2));
        assert!(record.is_frozen());
        assert_eq!(record.id(), Some(RecordId::new(1)));
    }
}
