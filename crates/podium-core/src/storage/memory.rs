use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Collection, Document, Storage, UpdateOutcome, apply_delete, apply_update, matches};
use crate::error::StorageResult;

/// Volatile storage; everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn collection(&self, name: &str) -> StorageResult<Arc<dyn Collection>> {
        let collection: Arc<dyn Collection> = self
            .collections
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(collection)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default)]
struct MemoryCollection {
    docs: Mutex<Vec<Document>>,
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn count(&self, filter: &Document) -> StorageResult<u64> {
        Ok(self.docs.lock().iter().filter(|d| matches(d, filter)).count() as u64)
    }

    async fn find_one(&self, filter: &Document) -> StorageResult<Option<Document>> {
        Ok(self.docs.lock().iter().find(|d| matches(d, filter)).cloned())
    }

    async fn find_many(&self, filter: &Document) -> StorageResult<Vec<Document>> {
        Ok(self
            .docs
            .lock()
            .iter()
            .filter(|d| matches(d, filter))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, doc: Document) -> StorageResult<()> {
        self.docs.lock().push(doc);
        Ok(())
    }

    async fn update_one(
        &self,
        filter: &Document,
        set: Document,
        upsert: bool,
    ) -> StorageResult<UpdateOutcome> {
        Ok(apply_update(&mut self.docs.lock(), filter, set, upsert))
    }

    async fn delete_one(&self, filter: &Document) -> StorageResult<bool> {
        Ok(apply_delete(&mut self.docs.lock(), filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::document;
    use serde_json::json;

    #[tokio::test]
    async fn test_collections_are_shared_by_name() {
        let storage = MemoryStorage::new();
        let records = storage.collection("records").unwrap();
        records
            .insert_one(document(json!({ "login": "alice", "time": 41000 })))
            .await
            .unwrap();

        let again = storage.collection("records").unwrap();
        assert_eq!(again.count(&Document::new()).await.unwrap(), 1);
        assert_eq!(
            storage
                .collection("maps")
                .unwrap()
                .count(&Document::new())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_find_update_delete() {
        let storage = MemoryStorage::new();
        let records = storage.collection("records").unwrap();
        let alice = document(json!({ "login": "alice" }));

        let outcome = records
            .update_one(&alice, document(json!({ "time": 41000 })), true)
            .await
            .unwrap();
        assert!(outcome.upserted);

        let found = records.find_one(&alice).await.unwrap().unwrap();
        assert_eq!(found["time"], 41000);

        assert!(records.delete_one(&alice).await.unwrap());
        assert!(!records.delete_one(&alice).await.unwrap());
        assert!(records.find_many(&Document::new()).await.unwrap().is_empty());
    }
}
