use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use sofa_core::collate::{collate, in_range};
use sofa_core::models::{AllDocsRow, DatabaseInfo, RevValue, ViewResponse, ViewRow, ID_FIELD, REV_FIELD};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Map function of a view: emits `(key, value)` pairs for one document
pub type MapFn = Arc<dyn Fn(&Value) -> Vec<(Value, Value)> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Database does not exist.")]
    DatabaseNotFound,

    #[error("missing")]
    DocumentNotFound,

    #[error("missing_named_view")]
    ViewNotFound,

    #[error("The database could not be created, the file already exists.")]
    DatabaseExists,

    #[error("Name: '{0}'. Only lowercase characters (a-z), digits (0-9), and any of the characters _, $, (, ), +, -, and / are allowed. Must begin with a letter.")]
    IllegalDatabaseName(String),

    #[error("Document update conflict.")]
    Conflict,

    #[error("{0}")]
    BadRequest(String),
}

impl StoreError {
    /// Short error code used in response bodies
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DatabaseNotFound | StoreError::DocumentNotFound | StoreError::ViewNotFound => {
                "not_found"
            }
            StoreError::DatabaseExists => "file_exists",
            StoreError::IllegalDatabaseName(_) => "illegal_database_name",
            StoreError::Conflict => "conflict",
            StoreError::BadRequest(_) => "bad_request",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub rev: String,
    /// Body without `_id` / `_rev`
    pub body: Map<String, Value>,
}

impl StoredDocument {
    /// The document as served: `_id`, `_rev`, then its fields
    pub fn to_json(&self, id: &str) -> Value {
        let mut doc = Map::with_capacity(self.body.len() + 2);
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        doc.insert(REV_FIELD.to_string(), Value::String(self.rev.clone()));
        doc.extend(self.body.clone());
        Value::Object(doc)
    }
}

/// In-memory databases and the views evaluated over them
#[derive(Default)]
pub struct MockStore {
    databases: BTreeMap<String, BTreeMap<String, StoredDocument>>,
    views: HashMap<(String, String), MapFn>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `design/view` for every database
    pub fn register_view(&mut self, design: &str, view: &str, map: MapFn) {
        tracing::debug!(design, view, "Registered view");
        self.views.insert((design.to_string(), view.to_string()), map);
    }

    pub fn with_view<F>(mut self, design: &str, view: &str, map: F) -> Self
    where
        F: Fn(&Value) -> Vec<(Value, Value)> + Send + Sync + 'static,
    {
        self.register_view(design, view, Arc::new(map));
        self
    }

    pub fn create_database(&mut self, name: &str) -> Result<()> {
        if !is_valid_db_name(name) {
            return Err(StoreError::IllegalDatabaseName(name.to_string()));
        }
        if self.databases.contains_key(name) {
            return Err(StoreError::DatabaseExists);
        }
        self.databases.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    pub fn database_info(&self, name: &str) -> Result<DatabaseInfo> {
        let docs = self.docs(name)?;
        Ok(DatabaseInfo {
            db_name: name.to_string(),
            doc_count: docs.len() as u64,
        })
    }

    pub fn delete_database(&mut self, name: &str) -> Result<()> {
        self.databases
            .remove(name)
            .map(|_| ())
            .ok_or(StoreError::DatabaseNotFound)
    }

    pub fn get_document(&self, db: &str, id: &str) -> Result<StoredDocument> {
        self.docs(db)?
            .get(id)
            .cloned()
            .ok_or(StoreError::DocumentNotFound)
    }

    /// Write a document. The `_rev` in `body` must match the stored
    /// revision, and must be absent when the document does not exist yet.
    pub fn put_document(&mut self, db: &str, id: &str, body: Value) -> Result<String> {
        let mut body = match body {
            Value::Object(body) => body,
            _ => return Err(StoreError::BadRequest("Document must be a JSON object".to_string())),
        };
        body.remove(ID_FIELD);
        let rev = match body.remove(REV_FIELD) {
            None => None,
            Some(Value::String(rev)) => Some(rev),
            Some(_) => return Err(StoreError::BadRequest("Invalid rev format".to_string())),
        };

        let docs = self.docs_mut(db)?;
        let previous = match (docs.get(id), rev) {
            (None, None) => None,
            (Some(current), Some(rev)) if current.rev == rev => Some(rev),
            _ => return Err(StoreError::Conflict),
        };

        let new_rev = next_rev(previous.as_deref(), &body);
        docs.insert(
            id.to_string(),
            StoredDocument {
                rev: new_rev.clone(),
                body,
            },
        );
        Ok(new_rev)
    }

    pub fn delete_document(&mut self, db: &str, id: &str, rev: Option<&str>) -> Result<()> {
        let docs = self.docs_mut(db)?;
        let current = docs.get(id).ok_or(StoreError::DocumentNotFound)?;
        if rev != Some(current.rev.as_str()) {
            return Err(StoreError::Conflict);
        }
        docs.remove(id);
        Ok(())
    }

    pub fn all_docs(&self, db: &str) -> Result<ViewResponse<AllDocsRow>> {
        let rows: Vec<AllDocsRow> = self
            .docs(db)?
            .iter()
            .map(|(id, doc)| AllDocsRow {
                id: id.clone(),
                key: id.clone(),
                value: RevValue { rev: doc.rev.clone() },
            })
            .collect();

        Ok(ViewResponse {
            total_rows: rows.len() as u64,
            offset: 0,
            rows,
        })
    }

    /// Rows of `design/view` with keys in the inclusive range, in key order
    pub fn query_view(
        &self,
        db: &str,
        design: &str,
        view: &str,
        start: Option<&Value>,
        end: Option<&Value>,
    ) -> Result<ViewResponse<ViewRow>> {
        let docs = self.docs(db)?;
        let map = self
            .views
            .get(&(design.to_string(), view.to_string()))
            .ok_or(StoreError::ViewNotFound)?;

        let mut rows: Vec<ViewRow> = Vec::new();
        for (id, doc) in docs {
            for (key, value) in map(&doc.to_json(id)) {
                rows.push(ViewRow {
                    id: Some(id.clone()),
                    key,
                    value,
                });
            }
        }
        rows.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));

        let total_rows = rows.len() as u64;
        let offset = rows
            .iter()
            .take_while(|row| !in_range(&row.key, start, None))
            .count() as u64;
        rows.retain(|row| in_range(&row.key, start, end));

        Ok(ViewResponse {
            total_rows,
            offset,
            rows,
        })
    }

    fn docs(&self, db: &str) -> Result<&BTreeMap<String, StoredDocument>> {
        self.databases.get(db).ok_or(StoreError::DatabaseNotFound)
    }

    fn docs_mut(&mut self, db: &str) -> Result<&mut BTreeMap<String, StoredDocument>> {
        self.databases.get_mut(db).ok_or(StoreError::DatabaseNotFound)
    }
}

/// View emitting `(doc[field], doc)` for each document that has `field`
pub fn field_view(field: &str) -> MapFn {
    let field = field.to_string();
    Arc::new(move |doc: &Value| match doc.get(&field) {
        Some(key) => vec![(key.clone(), doc.clone())],
        None => Vec::new(),
    })
}

/// `^[a-z][a-z0-9_$()+/-]*$`
pub fn is_valid_db_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c))
}

/// `{generation}-{hash}` following `previous`
fn next_rev(previous: Option<&str>, body: &Map<String, Value>) -> String {
    let generation = previous
        .and_then(|rev| rev.split_once('-'))
        .and_then(|(n, _)| n.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;

    let mut hasher = Sha256::new();
    hasher.update(previous.unwrap_or_default().as_bytes());
    hasher.update(Value::Object(body.clone()).to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}-{}", generation, &digest[..32])
}
