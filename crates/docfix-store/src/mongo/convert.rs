//! Mapping between docfix domain types and BSON.

use docfix_core::{Document, DocumentId, Filter, Scalar, StoreError};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document as BsonDocument, doc};

const ID_FIELD: &str = "_id";

pub(crate) fn scalar_to_bson(value: &Scalar) -> Bson {
    match value {
        Scalar::Null => Bson::Null,
        Scalar::Bool(b) => Bson::Boolean(*b),
        Scalar::Int(i) => Bson::Int64(*i),
        Scalar::Float(x) => Bson::Double(*x),
        Scalar::String(s) => Bson::String(s.clone()),
    }
}

/// Convert a document for insertion. The store assigns `_id`.
pub(crate) fn document_to_bson(doc: &Document) -> BsonDocument {
    doc.iter()
        .map(|(key, value)| (key.to_string(), scalar_to_bson(value)))
        .collect()
}

/// Convert a stored document back, rejecting non-scalar fields.
pub(crate) fn document_from_bson(mut raw: BsonDocument) -> Result<Document, StoreError> {
    let id = raw.remove(ID_FIELD).map(|id| id_from_bson(&id));

    let mut doc = Document::new();
    for (key, value) in raw {
        let scalar = match value {
            Bson::Null => Scalar::Null,
            Bson::Boolean(b) => Scalar::Bool(b),
            Bson::Int32(i) => Scalar::Int(i64::from(i)),
            Bson::Int64(i) => Scalar::Int(i),
            Bson::Double(x) => Scalar::Float(x),
            Bson::String(s) => Scalar::String(s),
            other => {
                return Err(StoreError::Query(format!(
                    "field `{key}` holds unsupported type {:?}",
                    other.element_type()
                )));
            }
        };
        doc.insert(key, scalar);
    }

    Ok(match id {
        Some(id) => doc.with_id(id),
        None => doc,
    })
}

pub(crate) fn id_from_bson(id: &Bson) -> DocumentId {
    match id {
        Bson::ObjectId(oid) => DocumentId::new(oid.to_hex()),
        Bson::String(s) => DocumentId::new(s.clone()),
        other => DocumentId::new(other.to_string()),
    }
}

/// Ids that look like `ObjectId`s are sent as such; anything else as a string.
pub(crate) fn id_to_bson(id: &DocumentId) -> Bson {
    ObjectId::parse_str(id.as_str()).map_or_else(|_| Bson::String(id.to_string()), Bson::ObjectId)
}

pub(crate) fn filter_to_bson(filter: &Filter) -> BsonDocument {
    match filter {
        Filter::All => BsonDocument::new(),
        Filter::Eq { field, value } => single(field, scalar_to_bson(value)),
        Filter::Prefix { field, prefix } => single(
            field,
            Bson::Document(doc! { "$regex": format!("^{}", regex::escape(prefix)) }),
        ),
        Filter::Regex { field, pattern } => {
            single(field, Bson::Document(doc! { "$regex": pattern.as_str() }))
        }
        Filter::IdIn(ids) => {
            let ids: Vec<Bson> = ids.iter().map(id_to_bson).collect();
            doc! { ID_FIELD: { "$in": ids } }
        }
        Filter::And(filters) if filters.is_empty() => BsonDocument::new(),
        Filter::And(filters) => {
            let clauses: Vec<Bson> = filters
                .iter()
                .map(|f| Bson::Document(filter_to_bson(f)))
                .collect();
            doc! { "$and": clauses }
        }
    }
}

fn single(field: &str, value: Bson) -> BsonDocument {
    let mut out = BsonDocument::new();
    out.insert(field, value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_to_bson_omits_id() {
        let doc = Document::new()
            .with("username", "admin")
            .with("logins", 3)
            .with_id(DocumentId::new("ignored"));

        let raw = document_to_bson(&doc);
        assert_eq!(raw, doc! { "logins": 3_i64, "username": "admin" });
    }

    #[test]
    fn test_document_from_bson_maps_object_id() {
        let oid = ObjectId::new();
        let raw = doc! {
            "_id": oid,
            "username": "admin",
            "age": 30_i32,
            "ratio": 0.5,
            "active": true,
            "note": Bson::Null,
        };

        let doc = document_from_bson(raw).unwrap();
        assert_eq!(doc.id(), Some(&DocumentId::new(oid.to_hex())));
        assert_eq!(doc.get_str("username"), Some("admin"));
        assert_eq!(doc.get("age"), Some(&Scalar::Int(30)));
        assert_eq!(doc.get("ratio"), Some(&Scalar::Float(0.5)));
        assert_eq!(doc.get("active"), Some(&Scalar::Bool(true)));
        assert_eq!(doc.get("note"), Some(&Scalar::Null));
    }

    #[test]
    fn test_document_from_bson_rejects_nested_values() {
        let err = document_from_bson(doc! { "profile": { "age": 1 } }).unwrap_err();
        assert!(matches!(err, StoreError::Query(ref msg) if msg.contains("profile")));
    }

    #[test]
    fn test_id_round_trips_through_bson() {
        let oid = ObjectId::new();
        let id = DocumentId::new(oid.to_hex());
        assert_eq!(id_to_bson(&id), Bson::ObjectId(oid));
        assert_eq!(id_to_bson(&DocumentId::new("custom")), Bson::String("custom".into()));
    }

    #[test]
    fn test_filter_translation() {
        assert_eq!(filter_to_bson(&Filter::All), doc! {});
        assert_eq!(
            filter_to_bson(&Filter::eq("username", "admin")),
            doc! { "username": "admin" }
        );
        assert_eq!(
            filter_to_bson(&Filter::prefix("username", "user.")),
            doc! { "username": { "$regex": "^user\\." } }
        );
        assert_eq!(
            filter_to_bson(&Filter::regex("username", "^u.*2$").unwrap()),
            doc! { "username": { "$regex": "^u.*2$" } }
        );
        assert_eq!(
            filter_to_bson(&Filter::ids([DocumentId::new("x")])),
            doc! { "_id": { "$in": ["x"] } }
        );
        assert_eq!(
            filter_to_bson(&Filter::eq("a", 1).and(Filter::eq("b", true))),
            doc! { "$and": [ { "a": 1_i64 }, { "b": true } ] }
        );
    }
}
