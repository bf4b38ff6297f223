//! Domain types shared by the harness and every store adapter.
//!
//! These are plain data types with no store-specific dependencies.

pub mod document;
pub mod filter;

pub use document::{Document, DocumentError, DocumentId, Scalar};
pub use filter::{Filter, FilterError};
