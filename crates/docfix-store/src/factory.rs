//! Composition utilities for building a `Harness` with a concrete store.
//!
//! This module is focused purely on construction and should not contain any
//! fixture logic.

use std::sync::Arc;

use docfix_core::{Harness, HarnessConfig};

use crate::memory::MemoryConnector;
#[cfg(feature = "mongodb")]
use crate::mongo::MongoConnector;

/// Factory for harnesses backed by the available adapters.
pub struct StoreFactory;

impl StoreFactory {
    /// Build a harness against MongoDB using `config`.
    #[cfg(feature = "mongodb")]
    pub fn mongo_harness(config: HarnessConfig) -> Harness {
        let connector = Arc::new(MongoConnector::from_config(&config));
        Harness::new(config, connector)
    }

    /// Build a MongoDB harness from `DOCFIX_*` environment variables.
    ///
    /// This is the usual entry point for a test suite:
    ///
    /// ```rust,no_run
    /// use docfix_store::StoreFactory;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let harness = StoreFactory::harness_from_env()?;
    /// harness.probe().await?;
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "mongodb")]
    pub fn harness_from_env() -> anyhow::Result<Harness> {
        let config = HarnessConfig::from_env()?;
        tracing::debug!(
            address = %config.address,
            collection = %config.collection,
            "Loaded harness configuration"
        );
        Ok(Self::mongo_harness(config))
    }

    /// Build a harness against an in-memory store.
    ///
    /// Returns the connector too, so tests can inspect stored documents or
    /// simulate outages.
    pub fn memory_harness(config: HarnessConfig) -> (Harness, MemoryConnector) {
        let connector = MemoryConnector::new();
        let harness = Harness::new(config, Arc::new(connector.clone()));
        (harness, connector)
    }
}
