//! Core types for the docfix fixture harness.
//!
//! `docfix-core` owns everything that does not depend on a concrete document
//! store: the [`Document`] and [`Filter`] domain types, the store ports
//! ([`StoreConnector`], [`DocumentStore`]), configuration, and the
//! [`Harness`] that drives the fixture lifecycle around them.
//!
//! Adapters for real stores live in `docfix-store`.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod harness;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{
    ConfigError, DEFAULT_COLLECTION, DEFAULT_CONNECT_TIMEOUT, DEFAULT_STORE_ADDRESS,
    DEFAULT_STORE_PORT, HarnessConfig, StoreAddress,
};
pub use domain::{Document, DocumentError, DocumentId, Filter, FilterError, Scalar};
pub use harness::{
    ConnectionHandle, FixtureSet, GroupContext, Harness, HarnessError, SeedReport,
};
pub use ports::{DocumentStore, StoreConnector, StoreError};

// Dev-dependencies used only by some test modules
#[cfg(test)]
use anyhow as _;
#[cfg(test)]
use tokio_test as _;
