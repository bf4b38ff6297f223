//! Harness error taxonomy.

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{DocumentError, FilterError};

/// Errors surfaced to a test step by the harness.
///
/// A missing document is not an error: [`fetch_one`] returns `None`.
///
/// [`fetch_one`]: crate::ConnectionHandle::fetch_one
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The store is unreachable or the handshake failed.
    #[error("Cannot connect to {address}: {reason}")]
    Connection { address: String, reason: String },

    /// The store rejected a seed or clear.
    #[error("Write to `{collection}` rejected: {reason}")]
    Write { collection: String, reason: String },

    /// A document was malformed; nothing was sent to the store.
    #[error("Malformed document #{index} for `{collection}`: {source}")]
    InvalidDocument {
        collection: String,
        index: usize,
        #[source]
        source: DocumentError,
    },

    /// A filter named a field the store would not treat as plain data;
    /// nothing was sent to the store.
    #[error("Invalid filter for `{collection}`: {source}")]
    InvalidFilter {
        collection: String,
        #[source]
        source: FilterError,
    },

    /// A fetch or count failed.
    #[error("Query on `{collection}` failed: {reason}")]
    Query { collection: String, reason: String },

    /// The handle was used after it was released.
    #[error("Connection handle {0} was already released")]
    Released(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Group setup failed; the group's body did not run.
    #[error("Fixture setup for `{collection}` failed: {source}")]
    Setup {
        collection: String,
        #[source]
        source: Box<HarnessError>,
    },

    /// Teardown left fixture documents behind.
    #[error("Teardown of `{collection}` left {remaining} fixture document(s) behind")]
    Teardown { collection: String, remaining: u64 },
}

impl HarnessError {
    /// Whether this is a store write failure, including malformed input.
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::InvalidDocument { .. })
    }

    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
