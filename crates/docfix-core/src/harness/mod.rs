//! The fixture harness.
//!
//! [`Harness`] opens [`ConnectionHandle`]s against a store through a
//! [`StoreConnector`] and runs test steps and fixture groups with guaranteed
//! cleanup:
//!
//! - [`Harness::with_connection`] releases the step's handle on every exit
//!   path, including panics from failed assertions.
//! - [`Harness::run_group`] seeds a [`FixtureSet`], runs the group body, then
//!   removes exactly the documents the group inserted and verifies none
//!   remain.
//!
//! Both hold the target collection's lock for their whole span, so steps and
//! groups on one collection run one at a time even under `cargo test`'s
//! parallel runner.
//!
//! # Example
//!
//! ```rust,ignore
//! let harness = Harness::new(HarnessConfig::from_env()?, connector);
//! let fixture = FixtureSet::new([Document::new().with("username", "admin")]);
//!
//! harness
//!     .run_group(fixture, |ctx| async move {
//!         let admin = ctx.fetch_one(&Filter::eq("username", "admin")).await?;
//!         assert!(admin.is_some());
//!         Ok::<_, anyhow::Error>(())
//!     })
//!     .await?;
//! ```

mod error;
mod fixture;
mod handle;
mod locks;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

pub use error::HarnessError;
pub use fixture::{FixtureSet, GroupContext};
pub use handle::{ConnectionHandle, SeedReport};

use crate::config::HarnessConfig;
use crate::domain::{DocumentId, Filter};
use crate::ports::StoreConnector;

/// Drives connections and fixture groups against one configured store.
#[derive(Clone)]
pub struct Harness {
    config: HarnessConfig,
    connector: Arc<dyn StoreConnector>,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Harness {
    pub fn new(config: HarnessConfig, connector: Arc<dyn StoreConnector>) -> Self {
        Self { config, connector }
    }

    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The configured fixture collection.
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Open a session to the configured store.
    ///
    /// The caller owns the handle and must [`release`](ConnectionHandle::release)
    /// it; prefer [`Harness::with_connection`], which does so automatically.
    pub async fn connect(&self) -> Result<ConnectionHandle, HarnessError> {
        let address = &self.config.address;
        let timeout = self.config.connect_timeout;

        let store = tokio::time::timeout(timeout, self.connector.connect(address))
            .await
            .map_err(|_| HarnessError::Connection {
                address: address.to_string(),
                reason: format!("timed out after {}ms", timeout.as_millis()),
            })?
            .map_err(|e| HarnessError::Connection {
                address: address.to_string(),
                reason: e.into_reason(),
            })?;

        let handle = ConnectionHandle::new(address.clone(), store);
        tracing::debug!(handle = %handle.id(), %address, "Opened connection");
        Ok(handle)
    }

    /// Connect and immediately release, proving the store is reachable.
    pub async fn probe(&self) -> Result<(), HarnessError> {
        let handle = self.connect().await?;
        handle.release().await
    }

    /// Run one test step against the configured collection with its own
    /// connection.
    ///
    /// The handle is released after `step` finishes, whether it returned
    /// `Ok`, returned `Err`, or panicked. A panic is re-raised after release.
    /// Calling this from inside a group on the same collection deadlocks.
    pub async fn with_connection<F, Fut, T, E>(&self, step: F) -> Result<T, E>
    where
        F: FnOnce(ConnectionHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<HarnessError>,
    {
        self.with_connection_in(&self.config.collection, step).await
    }

    /// Like [`Harness::with_connection`], holding the lock of `collection`
    /// instead of the configured one.
    pub async fn with_connection_in<F, Fut, T, E>(&self, collection: &str, step: F) -> Result<T, E>
    where
        F: FnOnce(ConnectionHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<HarnessError>,
    {
        let _guard = locks::lock_collection(&self.config.address, collection).await;

        let handle = self.connect().await?;
        let step_handle = handle.clone();
        let outcome = AssertUnwindSafe(async move { step(step_handle).await })
            .catch_unwind()
            .await;
        let released = handle.release().await;

        match outcome {
            Ok(Ok(value)) => {
                released?;
                Ok(value)
            }
            Ok(Err(e)) => {
                log_cleanup_failure(&handle, released.err());
                Err(e)
            }
            Err(panic) => {
                log_cleanup_failure(&handle, released.err());
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Run a fixture group.
    ///
    /// Holds the collection's exclusive lock for the whole group, then:
    ///
    /// 1. connects and seeds `fixture` (failure returns [`HarnessError::Setup`]
    ///    and `body` never runs);
    /// 2. runs `body`;
    /// 3. deletes every document the group inserted (the fixture plus
    ///    anything added through [`GroupContext::seed`]) by id, verifies none
    ///    remain, and releases the handle, on every exit path of `body`.
    ///
    /// If both `body` and teardown fail, the body's error is returned and the
    /// teardown error is logged. Nesting groups on the same collection
    /// deadlocks.
    pub async fn run_group<F, Fut, T, E>(&self, fixture: FixtureSet, body: F) -> Result<T, E>
    where
        F: FnOnce(GroupContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<HarnessError>,
    {
        let collection = fixture
            .collection
            .unwrap_or_else(|| self.config.collection.clone());
        let _guard = locks::lock_collection(&self.config.address, &collection).await;

        tracing::info!(
            collection = %collection,
            documents = fixture.documents.len(),
            "Starting fixture group"
        );

        let handle = self
            .connect()
            .await
            .map_err(|e| setup_failed(&collection, e))?;

        let seeded = match handle.seed(&collection, fixture.documents).await {
            Ok(report) => report,
            Err(e) => {
                log_cleanup_failure(&handle, handle.release().await.err());
                return Err(setup_failed(&collection, e).into());
            }
        };

        let ctx = GroupContext::new(handle.clone(), collection.clone(), seeded);
        let body_ctx = ctx.clone();
        let outcome = AssertUnwindSafe(async move { body(body_ctx).await })
            .catch_unwind()
            .await;

        let teardown = teardown(&handle, &collection, &ctx.inserted_ids()).await;
        let released = handle.release().await;
        let cleanup = teardown.and(released);

        match outcome {
            Ok(Ok(value)) => {
                cleanup?;
                tracing::info!(collection = %collection, "Finished fixture group");
                Ok(value)
            }
            Ok(Err(e)) => {
                log_cleanup_failure(&handle, cleanup.err());
                Err(e)
            }
            Err(panic) => {
                log_cleanup_failure(&handle, cleanup.err());
                std::panic::resume_unwind(panic)
            }
        }
    }
}

/// Remove exactly the documents a group inserted and confirm they are gone.
async fn teardown(
    handle: &ConnectionHandle,
    collection: &str,
    ids: &[DocumentId],
) -> Result<(), HarnessError> {
    if ids.is_empty() {
        return Ok(());
    }

    let filter = Filter::ids(ids.iter().cloned());
    handle.clear(collection, &filter).await?;

    let remaining = handle.count(collection, &filter).await?;
    if remaining > 0 {
        return Err(HarnessError::Teardown {
            collection: collection.to_string(),
            remaining,
        });
    }
    Ok(())
}

fn setup_failed(collection: &str, source: HarnessError) -> HarnessError {
    tracing::error!(collection, error = %source, "Fixture setup failed");
    HarnessError::Setup {
        collection: collection.to_string(),
        source: Box::new(source),
    }
}

fn log_cleanup_failure(handle: &ConnectionHandle, error: Option<HarnessError>) {
    if let Some(e) = error {
        tracing::error!(handle = %handle.id(), error = %e, "Cleanup failed after test step");
    }
}
