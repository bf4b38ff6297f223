//! Document domain types.
//!
//! A [`Document`] is a flat mapping from string keys to [`Scalar`] values plus
//! an optional store-assigned [`DocumentId`]. Nested values are not supported.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Name of the identifier field in serialized documents.
pub const ID_FIELD: &str = "_id";

/// Errors raised when a document is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// A field name was empty.
    #[error("Field name cannot be empty")]
    EmptyKey,

    /// A field name is reserved or contains forbidden characters.
    #[error("Invalid field name `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// A field held a value that is not a scalar.
    #[error("Field `{key}` must hold a scalar value, found {found}")]
    NonScalar { key: String, found: &'static str },

    /// An integer does not fit in a signed 64-bit value.
    #[error("Field `{key}` holds {value}, which does not fit in a 64-bit integer")]
    IntegerOutOfRange { key: String, value: String },

    /// The JSON value was not an object.
    #[error("Document must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Store-assigned document identifier.
///
/// Opaque to the harness; adapters decide the textual form (e.g. the hex form
/// of a MongoDB `ObjectId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap a store-provided identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the textual form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Borrow the value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Equality as a document store compares values: integers and floats
    /// compare numerically, everything else must match exactly.
    #[allow(clippy::cast_precision_loss)]
    pub fn loosely_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            _ => self == other,
        }
    }

    /// Short name of the value's type, used in diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A flat key-value record.
///
/// Built either field by field with [`Document::with`] or from a JSON object
/// with [`Document::from_json`]. Keys are validated by [`Document::validate`]
/// before a document is written to a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<DocumentId>,
    #[serde(flatten)]
    fields: BTreeMap<String, Scalar>,
}

impl Document {
    /// Create an empty document without an identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.fields.insert(key.into(), value.into())
    }

    /// Build a document from a JSON object.
    ///
    /// Every value must be a scalar and every key must pass
    /// [`Document::validate`]. `_id` is rejected because identifiers are
    /// assigned by the store.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DocumentError> {
        let serde_json::Value::Object(map) = value else {
            return Err(DocumentError::NotAnObject(json_type_name(&value)));
        };

        let mut doc = Self::new();
        for (key, value) in map {
            validate_key(&key)?;
            let scalar = match value {
                serde_json::Value::Null => Scalar::Null,
                serde_json::Value::Bool(b) => Scalar::Bool(b),
                serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => Scalar::Int(i),
                    (None, Some(x)) if n.is_f64() => Scalar::Float(x),
                    _ => {
                        return Err(DocumentError::IntegerOutOfRange {
                            key,
                            value: n.to_string(),
                        });
                    }
                },
                serde_json::Value::String(s) => Scalar::String(s),
                other => {
                    return Err(DocumentError::NonScalar {
                        key,
                        found: json_type_name(&other),
                    });
                }
            };
            doc.fields.insert(key, scalar);
        }
        Ok(doc)
    }

    /// Attach a store-assigned identifier. Used by adapters.
    #[must_use]
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    /// The store-assigned identifier, if the document came from a store.
    pub const fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.get(key)
    }

    /// Get a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Scalar::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields, not counting the identifier.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check every key against the store's field-name rules.
    pub fn validate(&self) -> Result<(), DocumentError> {
        self.fields.keys().try_for_each(|key| validate_key(key))
    }

    /// Render as JSON, including `_id` when assigned.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), DocumentError> {
    if key.is_empty() {
        return Err(DocumentError::EmptyKey);
    }
    let reason = if key == ID_FIELD {
        "identifier is assigned by the store"
    } else if key.starts_with('$') {
        "must not start with `$`"
    } else if key.contains('.') {
        "must not contain `.`"
    } else if key.contains('\0') {
        "must not contain NUL"
    } else {
        return Ok(());
    };
    Err(DocumentError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_accepts_flat_object() {
        let doc = Document::from_json(json!({
            "username": "admin",
            "password": "admin",
            "age": 42,
            "score": 1.5,
            "active": true,
            "nickname": null
        }))
        .unwrap();

        assert_eq!(doc.len(), 6);
        assert_eq!(doc.get_str("username"), Some("admin"));
        assert_eq!(doc.get("age"), Some(&Scalar::Int(42)));
        assert_eq!(doc.get("score"), Some(&Scalar::Float(1.5)));
        assert_eq!(doc.get("nickname"), Some(&Scalar::Null));
        assert!(doc.id().is_none());
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let err = Document::from_json(json!({"profile": {"age": 3}})).unwrap_err();
        assert_eq!(
            err,
            DocumentError::NonScalar {
                key: "profile".to_string(),
                found: "object"
            }
        );

        let err = Document::from_json(json!({"roles": ["admin"]})).unwrap_err();
        assert!(matches!(err, DocumentError::NonScalar { found: "array", .. }));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = Document::from_json(json!("admin")).unwrap_err();
        assert_eq!(err, DocumentError::NotAnObject("string"));
    }

    #[test]
    fn test_from_json_rejects_integers_beyond_i64() {
        let err = Document::from_json(json!({"big": u64::MAX})).unwrap_err();
        assert_eq!(
            err,
            DocumentError::IntegerOutOfRange {
                key: "big".to_string(),
                value: u64::MAX.to_string()
            }
        );

        let doc = Document::from_json(json!({"max": i64::MAX, "min": i64::MIN})).unwrap();
        assert_eq!(doc.get("max"), Some(&Scalar::Int(i64::MAX)));
        assert_eq!(doc.get("min"), Some(&Scalar::Int(i64::MIN)));
    }

    #[test]
    fn test_validate_rejects_reserved_keys() {
        for key in ["", "_id", "$set", "a.b"] {
            let doc = Document::new().with(key, "x");
            assert!(doc.validate().is_err(), "key {key:?} should be rejected");
        }
        assert!(Document::new().with("username", "x").validate().is_ok());
    }

    #[test]
    fn test_serializes_id_when_assigned() {
        let doc = Document::new()
            .with("username", "user")
            .with_id(DocumentId::new("abc123"));

        assert_eq!(doc.to_json(), json!({"_id": "abc123", "username": "user"}));

        let unsaved = Document::new().with("username", "user");
        assert_eq!(unsaved.to_json(), json!({"username": "user"}));
    }

    #[test]
    fn test_loosely_eq_compares_numbers() {
        assert!(Scalar::Int(2).loosely_eq(&Scalar::Float(2.0)));
        assert!(Scalar::Float(2.0).loosely_eq(&Scalar::Int(2)));
        assert!(!Scalar::Int(2).loosely_eq(&Scalar::String("2".into())));
    }
}
