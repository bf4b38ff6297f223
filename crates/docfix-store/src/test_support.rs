//! Test helpers: tracing setup and a self-contained in-memory harness.

use std::sync::Once;

use docfix_core::{Document, Harness, HarnessConfig, StoreAddress};
use tracing_subscriber::EnvFilter;

use crate::factory::StoreFactory;
use crate::memory::MemoryConnector;

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG`; defaults to `warn`. Output goes through the test
/// writer so it is captured per test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another subscriber may already be installed by the test binary.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// In-memory harness for integration tests.
///
/// Each instance uses its own store and a unique address, so tests running
/// in parallel never contend for collection locks.
pub struct TestHarness {
    harness: Harness,
    connector: MemoryConnector,
}

impl TestHarness {
    /// Database name used by every test harness.
    pub const DATABASE: &'static str = "digitalgateway";

    /// Create a harness for the `users` collection.
    pub fn new() -> Self {
        Self::with_collection(docfix_core::DEFAULT_COLLECTION)
    }

    pub fn with_collection(collection: &str) -> Self {
        init_test_tracing();

        let host = format!("memory-{}", uuid::Uuid::new_v4().simple());
        let address = StoreAddress::new(host, docfix_core::DEFAULT_STORE_PORT, Self::DATABASE)
            .unwrap_or_else(|e| panic!("test address must be valid: {e}"));
        let config = HarnessConfig::new(address, collection)
            .unwrap_or_else(|e| panic!("test collection must be valid: {e}"));

        let (harness, connector) = StoreFactory::memory_harness(config);
        Self { harness, connector }
    }

    pub const fn harness(&self) -> &Harness {
        &self.harness
    }

    pub const fn connector(&self) -> &MemoryConnector {
        &self.connector
    }

    /// Documents currently in `collection`, read around the harness.
    pub async fn stored(&self, collection: &str) -> Vec<Document> {
        self.connector.documents(Self::DATABASE, collection).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
