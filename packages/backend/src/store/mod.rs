pub mod change_feed;
pub mod memory;
pub mod paths;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use change_feed::{ChangeFeed, ChangeKind, DocumentChange, ListenerGuard};
pub use memory::MemoryStore;
pub use paths::DocPaths;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("document at {0} is not an object")]
    NotAnObject(String),
    #[error("invalid document at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON encode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One write inside a batch. A batch commits every op or none.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set { path: String, value: Value },
    /// Field-level update of an existing document; keys may be dotted paths.
    Merge { path: String, patch: Map<String, Value> },
    Delete { path: String },
}

impl WriteOp {
    pub fn path(&self) -> &str {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Merge { path, .. } | WriteOp::Delete { path } => path,
        }
    }
}

/// Equality condition on a (dotted) field; a missing field compares as `null`.
#[derive(Debug, Clone)]
pub struct Precondition {
    pub field: String,
    pub expected: Value,
}

impl Precondition {
    pub fn field_equals(field: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn field_missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: Value::Null,
        }
    }

    pub fn holds(&self, document: &Value) -> bool {
        lookup(document, &self.field).unwrap_or(&Value::Null) == &self.expected
    }
}

#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        lookup(document, &self.field) == Some(&self.value)
    }
}

/// Remote document database seam. Paths are `/`-separated; a collection's
/// documents are its direct children.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Documents directly under `collection`, as `(id, document)` pairs.
    async fn query(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Applies `patch` only when `precondition` holds; `Ok(false)` otherwise.
    async fn merge_if(
        &self,
        path: &str,
        precondition: Precondition,
        patch: Map<String, Value>,
    ) -> Result<bool, StoreError>;

    fn change_feed(&self) -> Arc<ChangeFeed>;

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.batch(vec![WriteOp::Set {
            path: path.to_string(),
            value,
        }])
        .await
    }

    async fn merge(&self, path: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.batch(vec![WriteOp::Merge {
            path: path.to_string(),
            patch,
        }])
        .await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.batch(vec![WriteOp::Delete {
            path: path.to_string(),
        }])
        .await
    }
}

/// Store handle plus the deployment's path layout; what managers receive.
#[derive(Clone)]
pub struct StoreProxy {
    store: Arc<dyn DocumentStore>,
    paths: DocPaths,
}

impl StoreProxy {
    pub fn new(store: Arc<dyn DocumentStore>, paths: DocPaths) -> Self {
        Self { store, paths }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn paths(&self) -> &DocPaths {
        &self.paths
    }

    pub fn change_feed(&self) -> Arc<ChangeFeed> {
        self.store.change_feed()
    }

    pub async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(path).await? {
            Some(value) => decode(path, value).map(Some),
            None => Ok(None),
        }
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<T>, StoreError> {
        let docs = self.store.query(collection, filter).await?;
        let mut out = Vec::with_capacity(docs.len());
        for (id, value) in docs {
            match decode(&format!("{collection}/{id}"), value) {
                Ok(doc) => out.push(doc),
                Err(err) => tracing::warn!(error = %err, "skipping undecodable document"),
            }
        }
        Ok(out)
    }

    pub async fn write<T: Serialize>(&self, path: &str, doc: &T) -> Result<(), StoreError> {
        self.store.set(path, serde_json::to_value(doc)?).await
    }
}

pub fn set_op<T: Serialize>(path: impl Into<String>, doc: &T) -> Result<WriteOp, StoreError> {
    Ok(WriteOp::Set {
        path: path.into(),
        value: serde_json::to_value(doc)?,
    })
}

/// Builds a merge patch from a serializable object.
pub fn patch_of<T: Serialize>(fields: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(fields)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject("<patch>".to_string())),
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
        path: path.to_string(),
        source,
    })
}

pub(crate) fn lookup<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(document, |current, key| current.as_object()?.get(key))
}

/// Applies a merge patch in place; dotted keys address nested objects,
/// creating intermediate objects as needed.
pub(crate) fn apply_patch(path: &str, document: &mut Value, patch: &Map<String, Value>) -> Result<(), StoreError> {
    for (key, value) in patch {
        let mut current = document
            .as_object_mut()
            .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?;
        let mut segments = key.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                current.insert(segment.to_string(), value.clone());
                break;
            }
            let child = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            current = child
                .as_object_mut()
                .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?;
        }
    }
    Ok(())
}
