//! Query filters understood by every store adapter.
//!
//! Filters cover the subset of store query language the harness needs:
//! match-all, exact match, string prefix, regex, identifier sets and
//! conjunctions. Adapters translate them to the store's native form; in-process
//! stores evaluate them with [`Filter::matches`].

use regex::Regex;
use thiserror::Error;

use super::document::{Document, DocumentError, DocumentId, Scalar, validate_key};

/// Errors raised when building or checking a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid regex pattern for field `{field}`: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// The field name would not be treated as a plain field by the store.
    #[error("Invalid filter field: {0}")]
    InvalidField(#[from] DocumentError),
}

/// A document filter.
#[derive(Debug, Clone, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    /// Field equals the value.
    Eq { field: String, value: Scalar },
    /// String field starts with the prefix.
    Prefix { field: String, prefix: String },
    /// String field matches the regex (unanchored).
    Regex { field: String, pattern: Regex },
    /// Document identifier is one of the given ids.
    IdIn(Vec<DocumentId>),
    /// Every inner filter matches. An empty conjunction matches everything.
    And(Vec<Filter>),
}

impl Filter {
    pub const fn all() -> Self {
        Self::All
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// Build a regex filter, checking the field and compiling the pattern up
    /// front.
    pub fn regex(field: impl Into<String>, pattern: &str) -> Result<Self, FilterError> {
        let field = field.into();
        validate_key(&field)?;
        let pattern = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            field: field.clone(),
            source,
        })?;
        Ok(Self::Regex { field, pattern })
    }

    pub fn ids(ids: impl IntoIterator<Item = DocumentId>) -> Self {
        Self::IdIn(ids.into_iter().collect())
    }

    /// Combine with another filter.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All => other,
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Check every field name against the document key rules.
    ///
    /// Field names follow the same rules as document keys, so a filter can
    /// never smuggle a query operator such as `$where` into the store.
    /// Identifier matching goes through [`Filter::ids`].
    pub fn validate(&self) -> Result<(), FilterError> {
        match self {
            Self::All | Self::IdIn(_) => Ok(()),
            Self::Eq { field, .. } | Self::Prefix { field, .. } | Self::Regex { field, .. } => {
                Ok(validate_key(field)?)
            }
            Self::And(filters) => filters.iter().try_for_each(Self::validate),
        }
    }

    /// Evaluate the filter against a document.
    ///
    /// Equality with `null` also matches documents missing the field, as in
    /// MongoDB.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq {
                field,
                value: Scalar::Null,
            } => doc.get(field).is_none_or(|v| *v == Scalar::Null),
            Self::Eq { field, value } => doc.get(field).is_some_and(|v| v.loosely_eq(value)),
            Self::Prefix { field, prefix } => doc
                .get_str(field)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Self::Regex { field, pattern } => doc.get_str(field).is_some_and(|s| pattern.is_match(s)),
            Self::IdIn(ids) => doc.id().is_some_and(|id| ids.contains(id)),
            Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Document {
        Document::new().with("username", name).with("password", name)
    }

    #[test]
    fn test_all_matches_everything() {
        assert!(Filter::all().matches(&user("admin")));
        assert!(Filter::default().matches(&Document::new()));
    }

    #[test]
    fn test_eq_requires_field_and_value() {
        let filter = Filter::eq("username", "admin");
        assert!(filter.matches(&user("admin")));
        assert!(!filter.matches(&user("user")));
        assert!(!filter.matches(&Document::new()));
    }

    #[test]
    fn test_eq_null_matches_missing_field() {
        let filter = Filter::eq("nickname", Scalar::Null);
        assert!(filter.matches(&user("admin")));
        assert!(filter.matches(&user("admin").with("nickname", Scalar::Null)));
        assert!(!filter.matches(&user("admin").with("nickname", "root")));
    }

    #[test]
    fn test_validate_rejects_operator_fields() {
        assert!(Filter::eq("username", "admin").validate().is_ok());
        assert!(Filter::ids([DocumentId::new("a1")]).validate().is_ok());

        for field in ["$where", "profile.age", "_id", ""] {
            let err = Filter::eq(field, "x").validate().unwrap_err();
            assert!(matches!(err, FilterError::InvalidField(_)), "{field:?} should be rejected");
        }

        let nested = Filter::prefix("username", "user").and(Filter::eq("$where", "1"));
        assert!(nested.validate().is_err());

        let err = Filter::regex("$where", "x").unwrap_err();
        assert!(matches!(err, FilterError::InvalidField(_)));
    }

    #[test]
    fn test_prefix_matches_strings_only() {
        let filter = Filter::prefix("username", "user");
        assert!(filter.matches(&user("user")));
        assert!(filter.matches(&user("user2")));
        assert!(!filter.matches(&user("admin")));
        assert!(!filter.matches(&Document::new().with("username", 7)));
    }

    #[test]
    fn test_regex_is_compiled_up_front() {
        let filter = Filter::regex("username", "^user[0-9]*$").unwrap();
        assert!(filter.matches(&user("user2")));
        assert!(!filter.matches(&user("superuser")));

        let err = Filter::regex("username", "(unclosed").unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_id_in_ignores_unsaved_documents() {
        let id = DocumentId::new("a1");
        let filter = Filter::ids([id.clone()]);
        assert!(filter.matches(&user("x").with_id(id)));
        assert!(!filter.matches(&user("x").with_id(DocumentId::new("b2"))));
        assert!(!filter.matches(&user("x")));
    }

    #[test]
    fn test_and_combines_filters() {
        let filter = Filter::all()
            .and(Filter::prefix("username", "user"))
            .and(Filter::eq("password", "user2"));
        assert!(matches!(&filter, Filter::And(f) if f.len() == 2));
        assert!(filter.matches(&user("user2")));
        assert!(!filter.matches(&user("user")));
    }
}
