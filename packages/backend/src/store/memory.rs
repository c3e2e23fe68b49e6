use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{
    apply_patch, ChangeFeed, DocumentChange, DocumentStore, FieldFilter, Precondition, StoreError,
    WriteOp,
};

/// In-process document store with live listeners and an optional JSON
/// snapshot that is rewritten after every commit.
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Value>>,
    feed: Arc<ChangeFeed>,
    snapshot_path: Option<PathBuf>,
    snapshot_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            feed: Arc::new(ChangeFeed::new()),
            snapshot_path: None,
            snapshot_lock: Mutex::new(()),
        }
    }

    /// Loads `path` when it exists and keeps it up to date afterwards.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let docs = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, Value>>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(StoreError::Io(err)),
        };

        info!(path = %path.display(), documents = docs.len(), "document snapshot loaded");

        Ok(Self {
            docs: RwLock::new(docs),
            feed: Arc::new(ChangeFeed::new()),
            snapshot_path: Some(path),
            snapshot_lock: Mutex::new(()),
        })
    }

    pub async fn document_count(&self) -> usize {
        self.docs.read().await.len()
    }

    async fn persist(&self) {
        let Some(ref path) = self.snapshot_path else {
            return;
        };

        let _guard = self.snapshot_lock.lock().await;
        let bytes = {
            let docs = self.docs.read().await;
            match serde_json::to_vec(&*docs) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(error = %err, "failed to encode document snapshot");
                    return;
                }
            }
        };

        let tmp = path.with_extension("tmp");
        if let Err(err) = write_atomically(&tmp, path, &bytes).await {
            warn!(error = %err, path = %path.display(), "failed to write document snapshot");
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_atomically(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(tmp, bytes).await?;
    tokio::fs::rename(tmp, path).await
}

fn child_id<'a>(collection: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(collection)?.strip_prefix('/')?;
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.read().await.get(path).cloned())
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.docs.read().await;
        let prefix = format!("{collection}/");

        Ok(docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, value)| child_id(collection, path).map(|id| (id, value)))
            .filter(|(_, value)| filter.as_ref().map_or(true, |f| f.matches(value)))
            .map(|(id, value)| (id.to_string(), value.clone()))
            .collect())
    }

    async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let changed = {
            let mut docs = self.docs.write().await;

            // stage against an overlay so a failing op leaves nothing applied
            let mut staged: BTreeMap<String, Option<Value>> = BTreeMap::new();
            for op in &ops {
                let path = op.path().to_string();
                match op {
                    WriteOp::Set { value, .. } => {
                        if !value.is_object() {
                            return Err(StoreError::NotAnObject(path));
                        }
                        staged.insert(path, Some(value.clone()));
                    }
                    WriteOp::Merge { patch, .. } => {
                        let current = match staged.get(&path) {
                            Some(entry) => entry.clone(),
                            None => docs.get(&path).cloned(),
                        };
                        let mut document = current.ok_or_else(|| StoreError::NotFound(path.clone()))?;
                        apply_patch(&path, &mut document, patch)?;
                        staged.insert(path, Some(document));
                    }
                    WriteOp::Delete { .. } => {
                        staged.insert(path, None);
                    }
                }
            }

            let mut changes = Vec::with_capacity(staged.len());
            for (path, entry) in staged {
                match entry {
                    Some(value) => {
                        docs.insert(path.clone(), value.clone());
                        changes.push(DocumentChange::set(path, value));
                    }
                    None => {
                        if let Some(previous) = docs.remove(&path) {
                            changes.push(DocumentChange::deleted(path, previous));
                        }
                    }
                }
            }

            // publish under the write guard so listeners see commits in order
            let changed = changes.len();
            self.feed.publish(changes).await;
            changed
        };

        debug!(ops = ops.len(), changed, "batch committed");
        self.persist().await;
        Ok(())
    }

    async fn merge_if(
        &self,
        path: &str,
        precondition: Precondition,
        patch: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        {
            let mut docs = self.docs.write().await;
            let document = docs
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

            if !precondition.holds(document) {
                debug!(path, field = %precondition.field, "conditional write rejected");
                return Ok(false);
            }

            let mut next = document.clone();
            apply_patch(path, &mut next, &patch)?;
            *document = next.clone();
            self.feed.publish(vec![DocumentChange::set(path, next)]).await;
        }

        self.persist().await;
        Ok(true)
    }

    fn change_feed(&self) -> Arc<ChangeFeed> {
        Arc::clone(&self.feed)
    }
}
