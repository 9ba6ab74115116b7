use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the document identifier
pub const ID_FIELD: &str = "_id";

/// Field carrying the revision tag
pub const REV_FIELD: &str = "_rev";

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document body must serialize to a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Build the JSON object written for a document: `_id` and `_rev` first,
/// then the caller's own fields in their serialized order.
///
/// Empty metadata values are left out. Any `_id`/`_rev` keys in `body`
/// are replaced by the given ones. `body` must serialize to an object.
pub fn envelope<T: Serialize + ?Sized>(
    id: &str,
    rev: Option<&str>,
    body: &T,
) -> Result<Value, EnvelopeError> {
    let fields = match serde_json::to_value(body)? {
        Value::Object(fields) => fields,
        other => return Err(EnvelopeError::NotAnObject(json_kind(&other))),
    };

    let mut doc = Map::with_capacity(fields.len() + 2);
    if !id.is_empty() {
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    }
    if let Some(rev) = rev.filter(|r| !r.is_empty()) {
        doc.insert(REV_FIELD.to_string(), Value::String(rev.to_string()));
    }
    for (key, value) in fields {
        if key == ID_FIELD || key == REV_FIELD {
            continue;
        }
        doc.insert(key, value);
    }

    Ok(Value::Object(doc))
}

pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip every `"` from an entity tag, yielding the bare revision
pub fn unquote_etag(etag: &str) -> String {
    etag.replace('"', "")
}

/// A stored document together with its metadata fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(flatten)]
    pub body: T,
}

/// Decoded document body plus the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub doc: T,
    pub rev: String,
}

/// Envelope of a view or `_all_docs` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewResponse<R> {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub offset: u64,
    pub rows: Vec<R>,
}

/// One emitted view row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow<K = Value, V = Value> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: K,
    pub value: V,
}

/// Row of the built-in `_all_docs` index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: RevValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevValue {
    #[serde(default)]
    pub rev: String,
}

/// Body returned by a successful document write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

/// Body returned by `GET /{db}/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub db_name: String,
    #[serde(default)]
    pub doc_count: u64,
}

/// Error body returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub reason: String,
}
