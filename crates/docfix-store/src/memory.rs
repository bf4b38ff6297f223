//! In-memory implementation of the store ports.
//!
//! Collections live in process memory and keep insertion order, so fixture
//! logic can be exercised without a server. Clones of a [`MemoryConnector`]
//! share the same data. Outages and write rejections can be simulated.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use docfix_core::{
    Document, DocumentId, DocumentStore, Filter, StoreAddress, StoreConnector, StoreError,
};

#[derive(Debug, Default)]
struct MemoryState {
    /// database -> collection -> documents in insertion order
    databases: HashMap<String, HashMap<String, Vec<Document>>>,
    /// collections whose writes are rejected
    read_only: HashSet<String>,
}

/// Connector for the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going down (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::Release);
    }

    /// Reject every write to `collection` with [`StoreError::Write`].
    pub async fn reject_writes_to(&self, collection: impl Into<String>) {
        self.state.lock().await.read_only.insert(collection.into());
    }

    /// Documents currently stored, read directly without a session.
    pub async fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.state
            .lock()
            .await
            .databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, address: &StoreAddress) -> Result<Box<dyn DocumentStore>, StoreError> {
        if self.unreachable.load(Ordering::Acquire) {
            return Err(StoreError::Connection(format!(
                "{}: connection refused",
                address.server_uri()
            )));
        }

        Ok(Box::new(MemoryStore {
            database: address.database().to_string(),
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A session on the in-memory store, scoped to one database.
#[derive(Debug)]
pub struct MemoryStore {
    database: String,
    state: Arc<Mutex<MemoryState>>,
    closed: AtomicBool,
}

impl MemoryStore {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn read<T>(&self, collection: &str, f: impl FnOnce(&[Document]) -> T) -> Result<T, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock().await;
        let docs = state
            .databases
            .get(&self.database)
            .and_then(|collections| collections.get(collection))
            .map_or(&[][..], Vec::as_slice);
        Ok(f(docs))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<DocumentId>, StoreError> {
        self.ensure_open()?;

        // Validate the whole batch first so a rejection writes nothing.
        for doc in &documents {
            doc.validate()
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }

        let mut state = self.state.lock().await;
        if state.read_only.contains(collection) {
            return Err(StoreError::Write(format!(
                "not authorized to write to `{collection}`"
            )));
        }

        let stored = state
            .databases
            .entry(self.database.clone())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = DocumentId::new(uuid::Uuid::new_v4().simple().to_string());
            stored.push(doc.with_id(id.clone()));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.ensure_open()?;

        let mut state = self.state.lock().await;
        if state.read_only.contains(collection) {
            return Err(StoreError::Write(format!(
                "not authorized to write to `{collection}`"
            )));
        }

        let Some(stored) = state
            .databases
            .get_mut(&self.database)
            .and_then(|collections| collections.get_mut(collection))
        else {
            return Ok(0);
        };

        let before = stored.len();
        stored.retain(|doc| !filter.matches(doc));
        Ok((before - stored.len()) as u64)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        self.read(collection, |docs| {
            docs.iter().find(|doc| filter.matches(doc)).cloned()
        })
        .await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.read(collection, |docs| {
            docs.iter()
                .filter(|doc| filter.matches(doc))
                .cloned()
                .collect()
        })
        .await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.read(collection, |docs| {
            docs.iter().filter(|doc| filter.matches(doc)).count() as u64
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}
