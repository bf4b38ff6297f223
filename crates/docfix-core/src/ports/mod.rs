//! Port definitions (trait abstractions) for external document stores.
//!
//! Ports define what the harness expects from a store. They contain no
//! driver details and use only domain types.
//!
//! # Design Rules
//!
//! - No driver types (e.g. `bson`) in any signature
//! - Traits are minimal and CRUD-focused
//! - Connecting is separate from using a connection, so each test step can
//!   own exactly one session

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreAddress;
use crate::domain::{Document, DocumentId, Filter};

/// Errors reported by store adapters.
///
/// This error type abstracts away driver details and lets the harness map
/// failures onto its own taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store is unreachable or the handshake failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected a write.
    #[error("Write error: {0}")]
    Write(String),

    /// A read failed or returned data the adapter could not map.
    #[error("Query error: {0}")]
    Query(String),

    /// The session was already closed.
    #[error("Session closed")]
    Closed,
}

impl StoreError {
    /// The adapter's message without the category prefix.
    pub fn into_reason(self) -> String {
        match self {
            Self::Connection(reason) | Self::Write(reason) | Self::Query(reason) => reason,
            Self::Closed => "session closed".to_string(),
        }
    }
}

/// Opens sessions against a store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Open a session and confirm the store answers.
    async fn connect(&self, address: &StoreAddress) -> Result<Box<dyn DocumentStore>, StoreError>;
}

/// An open session with a store.
///
/// All operations are scoped to the database named in the address the
/// session was opened with.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert documents in order, returning their assigned ids in the same order.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<DocumentId>, StoreError>;

    /// Delete every matching document, returning how many were removed.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Fetch the first matching document in natural order.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    /// Fetch every matching document in natural order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Count matching documents.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Close the session. Further calls fail with [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError>;
}
