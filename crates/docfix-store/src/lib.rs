//! Store adapters for the docfix harness.
//!
//! - [`MongoConnector`] opens sessions against a MongoDB server through the
//!   official driver (feature `mongodb`, on by default).
//! - [`MemoryConnector`] keeps collections in process memory, for exercising
//!   the harness without a server.
//!
//! [`StoreFactory`] wires either adapter into a [`docfix_core::Harness`].
//! Driver types are confined to this crate and never appear in the port
//! trait signatures.

#![deny(unsafe_code)]

pub mod factory;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use factory::StoreFactory;
pub use memory::{MemoryConnector, MemoryStore};
#[cfg(feature = "mongodb")]
pub use mongo::{MongoConnector, MongoStore};
#[cfg(any(test, feature = "test-utils"))]
pub use test_support::{TestHarness, init_test_tracing};
