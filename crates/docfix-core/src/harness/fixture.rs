//! Fixture sets and the per-group context handed to test bodies.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ConnectionHandle, HarnessError, SeedReport};
use crate::domain::{Document, DocumentError, DocumentId, Filter};

/// Documents seeded before a test group and removed after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureSet {
    pub(crate) collection: Option<String>,
    pub(crate) documents: Vec<Document>,
}

impl FixtureSet {
    /// Fixture for the harness's configured collection.
    pub fn new(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            collection: None,
            documents: documents.into_iter().collect(),
        }
    }

    /// Build a fixture from JSON objects.
    pub fn from_json(
        values: impl IntoIterator<Item = serde_json::Value>,
    ) -> Result<Self, DocumentError> {
        let documents = values
            .into_iter()
            .map(Document::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(documents))
    }

    /// An empty fixture: the group runs against whatever the collection holds.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Target a collection other than the configured one.
    #[must_use]
    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// What a group body sees: its handle, collection and seeded ids.
///
/// Clones share the record of inserted ids, so documents added through
/// [`GroupContext::seed`] are removed at teardown along with the fixture.
#[derive(Debug, Clone)]
pub struct GroupContext {
    handle: ConnectionHandle,
    collection: String,
    seeded: SeedReport,
    inserted: Arc<Mutex<Vec<DocumentId>>>,
}

impl GroupContext {
    pub(crate) fn new(handle: ConnectionHandle, collection: String, seeded: SeedReport) -> Self {
        let inserted = Arc::new(Mutex::new(seeded.ids.clone()));
        Self {
            handle,
            collection,
            seeded,
            inserted,
        }
    }

    pub const fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Report from the group's setup seed.
    pub const fn seeded(&self) -> &SeedReport {
        &self.seeded
    }

    /// Filter selecting exactly the documents this group seeded.
    pub fn seeded_filter(&self) -> Filter {
        Filter::ids(self.seeded.ids.iter().cloned())
    }

    /// Every id inserted by the group so far: the setup seed followed by
    /// anything added through [`GroupContext::seed`].
    pub fn inserted_ids(&self) -> Vec<DocumentId> {
        self.inserted_lock().clone()
    }

    pub async fn fetch_one(&self, filter: &Filter) -> Result<Option<Document>, HarnessError> {
        self.handle.fetch_one(&self.collection, filter).await
    }

    pub async fn fetch_all(&self, filter: &Filter) -> Result<Vec<Document>, HarnessError> {
        self.handle.fetch_all(&self.collection, filter).await
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, HarnessError> {
        self.handle.count(&self.collection, filter).await
    }

    /// Insert more documents into the group's collection.
    ///
    /// They are tracked and removed at teardown.
    pub async fn seed(
        &self,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<SeedReport, HarnessError> {
        let report = self.handle.seed(&self.collection, documents).await?;
        self.inserted_lock().extend(report.ids.iter().cloned());
        Ok(report)
    }

    pub async fn clear(&self, filter: &Filter) -> Result<u64, HarnessError> {
        self.handle.clear(&self.collection, filter).await
    }

    fn inserted_lock(&self) -> MutexGuard<'_, Vec<DocumentId>> {
        // A body that panicked mid-push still leaves a usable id list.
        self.inserted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_order() {
        let fixture = FixtureSet::from_json([
            json!({"username": "user", "password": "user"}),
            json!({"username": "user2", "password": "user2"}),
        ])
        .unwrap();

        assert_eq!(fixture.len(), 2);
        assert_eq!(fixture.documents()[0].get_str("username"), Some("user"));
        assert_eq!(fixture.documents()[1].get_str("username"), Some("user2"));
        assert_eq!(fixture.collection, None);
    }

    #[test]
    fn test_from_json_propagates_malformed_document() {
        let err = FixtureSet::from_json([json!({"username": "a"}), json!([1, 2])]).unwrap_err();
        assert_eq!(err, DocumentError::NotAnObject("array"));
    }

    #[test]
    fn test_in_collection_overrides_target() {
        let fixture = FixtureSet::empty().in_collection("sessions");
        assert!(fixture.is_empty());
        assert_eq!(fixture.collection.as_deref(), Some("sessions"));
    }
}
