//! Persistence port.
//!
//! Plugins keep records, map statistics and saved settings through a
//! [`Storage`] handle selected once at startup. A storage is a set of named
//! [`Collection`]s of JSON documents.
//!
//! Filters are JSON objects matched by top-level field equality; the empty
//! object matches every document. There is deliberately no query language
//! beyond that.
//!
//! | Backend | Durability |
//! |---------|------------|
//! | [`MemoryStorage`] | process lifetime |
//! | [`JsonFileStorage`] | one `<collection>.json` file per collection |

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageResult;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

/// A stored document.
pub type Document = Map<String, Value>;

/// Result of [`Collection::update_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Number of documents that matched the filter (0 or 1).
    pub matched: u64,
    /// Whether a new document was inserted.
    pub upserted: bool,
}

/// A named set of documents.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Counts documents matching `filter`.
    async fn count(&self, filter: &Document) -> StorageResult<u64>;

    /// Returns the first document matching `filter`.
    async fn find_one(&self, filter: &Document) -> StorageResult<Option<Document>>;

    /// Returns every document matching `filter`, in insertion order.
    async fn find_many(&self, filter: &Document) -> StorageResult<Vec<Document>>;

    /// Inserts a document.
    async fn insert_one(&self, doc: Document) -> StorageResult<()>;

    /// Sets the fields of `set` on the first document matching `filter`.
    ///
    /// With `upsert`, a missing document is created from the filter fields
    /// overlaid with `set`.
    async fn update_one(
        &self,
        filter: &Document,
        set: Document,
        upsert: bool,
    ) -> StorageResult<UpdateOutcome>;

    /// Deletes the first document matching `filter`. Returns whether one was
    /// removed.
    async fn delete_one(&self, filter: &Document) -> StorageResult<bool>;
}

/// A connected storage backend.
pub trait Storage: Send + Sync {
    /// Returns the named collection, creating it on first use.
    fn collection(&self, name: &str) -> StorageResult<Arc<dyn Collection>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Returns `true` when every field of `filter` equals the same field in `doc`.
pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, want)| doc.get(key) == Some(want))
}

/// Builds a filter or document from a JSON object literal.
///
/// Non-object values yield an empty document.
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Applies an update to a document list. Shared by the backends.
pub(crate) fn apply_update(
    docs: &mut Vec<Document>,
    filter: &Document,
    set: Document,
    upsert: bool,
) -> UpdateOutcome {
    if let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) {
        doc.extend(set);
        return UpdateOutcome {
            matched: 1,
            upserted: false,
        };
    }
    if !upsert {
        return UpdateOutcome::default();
    }
    let mut doc = filter.clone();
    doc.extend(set);
    docs.push(doc);
    UpdateOutcome {
        matched: 0,
        upserted: true,
    }
}

/// Removes the first matching document. Shared by the backends.
pub(crate) fn apply_delete(docs: &mut Vec<Document>, filter: &Document) -> bool {
    match docs.iter().position(|d| matches(d, filter)) {
        Some(index) => {
            docs.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matches_top_level_equality() {
        let doc = document(json!({ "login": "alice", "time": 41000, "map": "uid1" }));
        assert!(matches(&doc, &Document::new()));
        assert!(matches(&doc, &document(json!({ "login": "alice" }))));
        assert!(matches(
            &doc,
            &document(json!({ "login": "alice", "map": "uid1" }))
        ));
        assert!(!matches(&doc, &document(json!({ "login": "bob" }))));
        assert!(!matches(&doc, &document(json!({ "missing": null }))));
    }

    #[test]
    fn test_apply_update_and_upsert() {
        let mut docs = vec![document(json!({ "login": "alice", "time": 50000 }))];

        let outcome = apply_update(
            &mut docs,
            &document(json!({ "login": "alice" })),
            document(json!({ "time": 42000 })),
            false,
        );
        assert_eq!(outcome.matched, 1);
        assert_eq!(docs[0]["time"], 42000);

        let outcome = apply_update(
            &mut docs,
            &document(json!({ "login": "bob" })),
            document(json!({ "time": 45000 })),
            false,
        );
        assert_eq!(outcome, UpdateOutcome::default());
        assert_eq!(docs.len(), 1);

        let outcome = apply_update(
            &mut docs,
            &document(json!({ "login": "bob" })),
            document(json!({ "time": 45000 })),
            true,
        );
        assert!(outcome.upserted);
        assert_eq!(docs[1], document(json!({ "login": "bob", "time": 45000 })));
    }
}
