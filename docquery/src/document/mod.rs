// Documents - schemaless JSON objects as stored and returned

use crate::value::ObjectId;

/// Identifier field present on every stored document
pub const ID_FIELD: &str = "_id";

/// A document as held by the store: field order is preserved.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// The native identifier of a stored document, if it has one.
pub fn object_id(doc: &Document) -> Option<ObjectId> {
    doc.get(ID_FIELD).and_then(ObjectId::from_json)
}

/// Replace a native `{"$oid": ..}` identifier with its plain hex string.
pub fn normalize_id(mut doc: Document) -> Document {
    if let Some(id) = object_id(&doc) {
        doc.insert(ID_FIELD.to_string(), serde_json::Value::String(id.to_hex()));
    }
    doc
}

/// Resolve a dotted path (`address.city`) inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a serde_json::Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Set a dotted path, creating intermediate objects. A non-object in the way
/// is replaced.
pub fn set_path(doc: &mut Document, path: &str, value: serde_json::Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| serde_json::Value::Object(Document::new()));
            if !entry.is_object() {
                *entry = serde_json::Value::Object(Document::new());
            }
            if let serde_json::Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}

/// Convert a JSON object into a document; anything else is rejected.
pub fn from_json(value: serde_json::Value) -> Option<Document> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}
