use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{Collection, Document, Storage, UpdateOutcome, apply_delete, apply_update, matches};
use crate::error::{StorageError, StorageResult};

/// Storage backed by one JSON file per collection.
///
/// Each collection is read on every operation and rewritten after every
/// mutation, through a temporary file and a rename.
pub struct JsonFileStorage {
    dir: PathBuf,
    collections: Mutex<HashMap<String, Arc<JsonFileCollection>>>,
}

impl JsonFileStorage {
    /// Opens (and creates if needed) the storage directory.
    pub async fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(path = %dir.display(), "Opened JSON file storage");
        Ok(Self {
            dir,
            collections: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidCollection(name.to_string()))
    }
}

impl Storage for JsonFileStorage {
    fn collection(&self, name: &str) -> StorageResult<Arc<dyn Collection>> {
        validate_name(name)?;
        let collection: Arc<dyn Collection> = self
            .collections
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(JsonFileCollection {
                    path: self.dir.join(format!("{name}.json")),
                    write_lock: tokio::sync::Mutex::new(()),
                })
            })
            .clone();
        Ok(collection)
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}

struct JsonFileCollection {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileCollection {
    async fn load(&self) -> StorageResult<Vec<Document>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, docs: &[Document]) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(docs)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = docs.len(), "Collection written");
        Ok(())
    }
}

#[async_trait]
impl Collection for JsonFileCollection {
    async fn count(&self, filter: &Document) -> StorageResult<u64> {
        let _guard = self.write_lock.lock().await;
        let docs = self.load().await?;
        Ok(docs.iter().filter(|d| matches(d, filter)).count() as u64)
    }

    async fn find_one(&self, filter: &Document) -> StorageResult<Option<Document>> {
        let _guard = self.write_lock.lock().await;
        let docs = self.load().await?;
        Ok(docs.into_iter().find(|d| matches(d, filter)))
    }

    async fn find_many(&self, filter: &Document) -> StorageResult<Vec<Document>> {
        let _guard = self.write_lock.lock().await;
        let docs = self.load().await?;
        Ok(docs.into_iter().filter(|d| matches(d, filter)).collect())
    }

    async fn insert_one(&self, doc: Document) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.load().await?;
        docs.push(doc);
        self.store(&docs).await
    }

    async fn update_one(
        &self,
        filter: &Document,
        set: Document,
        upsert: bool,
    ) -> StorageResult<UpdateOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.load().await?;
        let outcome = apply_update(&mut docs, filter, set, upsert);
        if outcome.matched > 0 || outcome.upserted {
            self.store(&docs).await?;
        }
        Ok(outcome)
    }

    async fn delete_one(&self, filter: &Document) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.load().await?;
        let removed = apply_delete(&mut docs, filter);
        if removed {
            self.store(&docs).await?;
        }
        Ok(removed)
    }
}
