//! Connection handles.
//!
//! A [`ConnectionHandle`] wraps one open store session. Clones share the same
//! session; releasing any clone releases all of them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::HarnessError;
use crate::config::StoreAddress;
use crate::domain::{Document, DocumentId, Filter};
use crate::ports::{DocumentStore, StoreError};

/// Outcome of a successful seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Number of documents inserted.
    pub inserted: usize,
    /// Store-assigned identifiers, in insertion order.
    pub ids: Vec<DocumentId>,
}

struct HandleInner {
    id: String,
    address: StoreAddress,
    store: Box<dyn DocumentStore>,
    released: AtomicBool,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if !self.released.load(Ordering::Acquire) {
            tracing::warn!(
                handle = %self.id,
                address = %self.address,
                "Connection handle dropped without release"
            );
        }
    }
}

/// An open session with the store, owned by one test step.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.inner.id)
            .field("address", &self.inner.address)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl ConnectionHandle {
    pub(crate) fn new(address: StoreAddress, store: Box<dyn DocumentStore>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: uuid::Uuid::new_v4().simple().to_string()[..12].to_string(),
                address,
                store,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Short identifier used in log records.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn address(&self) -> &StoreAddress {
        &self.inner.address
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Insert documents in order.
    ///
    /// Every document is validated first; a malformed document rejects the
    /// whole batch before the store is contacted. An empty batch succeeds
    /// without a round trip.
    pub async fn seed(
        &self,
        collection: &str,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<SeedReport, HarnessError> {
        self.ensure_open()?;

        let documents: Vec<Document> = documents.into_iter().collect();
        for (index, doc) in documents.iter().enumerate() {
            doc.validate()
                .map_err(|source| HarnessError::InvalidDocument {
                    collection: collection.to_string(),
                    index,
                    source,
                })?;
        }

        if documents.is_empty() {
            return Ok(SeedReport::default());
        }

        let expected = documents.len();
        let ids = self
            .inner
            .store
            .insert_many(collection, documents)
            .await
            .map_err(|e| self.map_store_error(collection, e, Op::Write))?;

        if ids.len() != expected {
            return Err(HarnessError::Write {
                collection: collection.to_string(),
                reason: format!("store acknowledged {} of {expected} documents", ids.len()),
            });
        }

        tracing::debug!(
            handle = %self.id(),
            collection,
            count = ids.len(),
            "Seeded fixture documents"
        );

        Ok(SeedReport {
            inserted: ids.len(),
            ids,
        })
    }

    /// Remove every document matching `filter`, returning how many went.
    ///
    /// Clearing an empty match set succeeds and reports zero.
    pub async fn clear(&self, collection: &str, filter: &Filter) -> Result<u64, HarnessError> {
        self.ensure_open()?;
        check_filter(collection, filter)?;

        let removed = self
            .inner
            .store
            .delete_many(collection, filter)
            .await
            .map_err(|e| self.map_store_error(collection, e, Op::Write))?;

        tracing::debug!(handle = %self.id(), collection, removed, "Cleared documents");
        Ok(removed)
    }

    /// Remove every document in the collection.
    pub async fn clear_all(&self, collection: &str) -> Result<u64, HarnessError> {
        self.clear(collection, &Filter::All).await
    }

    /// Fetch the first matching document; `None` when nothing matches.
    pub async fn fetch_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, HarnessError> {
        self.ensure_open()?;
        check_filter(collection, filter)?;

        self.inner
            .store
            .find_one(collection, filter)
            .await
            .map_err(|e| self.map_store_error(collection, e, Op::Read))
    }

    /// Fetch every matching document in the store's natural order.
    ///
    /// Each call re-runs the query.
    pub async fn fetch_all(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, HarnessError> {
        self.ensure_open()?;
        check_filter(collection, filter)?;

        self.inner
            .store
            .find(collection, filter)
            .await
            .map_err(|e| self.map_store_error(collection, e, Op::Read))
    }

    pub async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, HarnessError> {
        self.ensure_open()?;
        check_filter(collection, filter)?;

        self.inner
            .store
            .count(collection, filter)
            .await
            .map_err(|e| self.map_store_error(collection, e, Op::Read))
    }

    /// Close the session.
    ///
    /// Idempotent: releasing an already released handle succeeds.
    pub async fn release(&self) -> Result<(), HarnessError> {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        match self.inner.store.close().await {
            Ok(()) | Err(StoreError::Closed) => {
                tracing::debug!(handle = %self.id(), "Released connection");
                Ok(())
            }
            Err(e) => Err(HarnessError::Connection {
                address: self.inner.address.to_string(),
                reason: e.into_reason(),
            }),
        }
    }

    fn ensure_open(&self) -> Result<(), HarnessError> {
        if self.is_released() {
            return Err(HarnessError::Released(self.inner.id.clone()));
        }
        Ok(())
    }

    fn map_store_error(&self, collection: &str, err: StoreError, op: Op) -> HarnessError {
        match (err, op) {
            (StoreError::Connection(reason), _) => HarnessError::Connection {
                address: self.inner.address.to_string(),
                reason,
            },
            (StoreError::Closed, _) => HarnessError::Released(self.inner.id.clone()),
            (StoreError::Write(reason) | StoreError::Query(reason), Op::Write) => {
                HarnessError::Write {
                    collection: collection.to_string(),
                    reason,
                }
            }
            (StoreError::Write(reason) | StoreError::Query(reason), Op::Read) => {
                HarnessError::Query {
                    collection: collection.to_string(),
                    reason,
                }
            }
        }
    }
}

fn check_filter(collection: &str, filter: &Filter) -> Result<(), HarnessError> {
    filter
        .validate()
        .map_err(|source| HarnessError::InvalidFilter {
            collection: collection.to_string(),
            source,
        })
}

#[derive(Clone, Copy)]
enum Op {
    Read,
    Write,
}
