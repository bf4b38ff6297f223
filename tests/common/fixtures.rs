//! Test fixtures for user documents.
//!
//! Provides helpers for building the user records the suites seed.

#![allow(dead_code)]

use docfix::{Document, FixtureSet};
use serde_json::json;

/// Creates a user whose password equals the username.
///
/// # Example
///
/// ```rust,ignore
/// use crate::common::fixtures::user;
///
/// let admin = user("admin");
/// assert_eq!(admin.get_str("password"), Some("admin"));
/// ```
pub fn user(name: &str) -> Document {
    Document::new().with("username", name).with("password", name)
}

/// The two prefix-matching users, in insertion order.
pub fn users_fixture() -> FixtureSet {
    FixtureSet::from_json([
        json!({"username": "user", "password": "user"}),
        json!({"username": "user2", "password": "user2"}),
    ])
    .expect("fixture documents are well formed")
}

/// Users where only some match the `user` prefix.
pub fn mixed_users() -> Vec<Document> {
    vec![user("admin"), user("user"), user("guest"), user("user2"), user("superuser")]
}

/// Usernames of `docs`, in order.
pub fn usernames(docs: &[Document]) -> Vec<&str> {
    docs.iter().filter_map(|d| d.get_str("username")).collect()
}

/// Assert that `doc` is the stored form of `user(name)`.
pub fn assert_stored_user(doc: &Document, name: &str) {
    assert_eq!(doc.get_str("username"), Some(name));
    assert_eq!(doc.get_str("password"), Some(name));
    let id = doc.id().expect("stored document should carry an id");
    assert!(!id.is_empty(), "stored id should not be empty");
}
