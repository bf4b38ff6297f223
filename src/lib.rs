//! # docfix
//!
//! Fixture harness for integration tests that run against an external
//! document store.
//!
//! This crate is a convenience re-export layer over the workspace crates:
//!
//! - `docfix_core` - Domain types, store ports, configuration and the harness
//! - `docfix_store` - MongoDB and in-memory adapters plus the factory
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docfix::{FixtureSet, Filter, StoreFactory};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let harness = StoreFactory::harness_from_env()?;
//! let fixture = FixtureSet::from_json([
//!     json!({"username": "user", "password": "user"}),
//!     json!({"username": "user2", "password": "user2"}),
//! ])?;
//!
//! harness
//!     .run_group(fixture, |ctx| async move {
//!         let users = ctx.fetch_all(&Filter::prefix("username", "user")).await?;
//!         assert_eq!(users.len(), 2);
//!         Ok::<_, anyhow::Error>(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Workspace Crate Re-exports
// =============================================================================

pub use docfix_core::{
    ConfigError, ConnectionHandle, DEFAULT_COLLECTION, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_STORE_ADDRESS, DEFAULT_STORE_PORT, Document, DocumentError, DocumentId, DocumentStore,
    Filter, FilterError, FixtureSet, GroupContext, Harness, HarnessConfig, HarnessError, Scalar,
    SeedReport, StoreAddress, StoreConnector, StoreError,
};

pub use docfix_store::{MemoryConnector, MemoryStore, StoreFactory};

#[cfg(feature = "mongodb")]
pub use docfix_store::{MongoConnector, MongoStore};

#[cfg(feature = "test-utils")]
pub use docfix_store::{TestHarness, init_test_tracing};
