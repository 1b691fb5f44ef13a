//! `RelationalClient`: the integration seam standing in for "the
//! relational store" (§3, §4.3). A concrete deployment backs this with a
//! real SQL/document database; the in-memory double here mirrors
//! `vclip-firestore`'s fake-transport test style.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;

/// Generic collection/doc_id/fields document store, the same seam shape
/// the teacher wraps with typed repositories (`FirestoreClient`).
#[async_trait]
pub trait RelationalClient: Send + Sync {
    /// Create schema/indexes if missing. Called once by `StorageAdapter::new`.
    async fn ensure_schema(&self) -> StorageResult<()>;

    async fn get_document(&self, collection: &str, doc_id: &str) -> StorageResult<Option<Value>>;

    /// Upsert keyed by `doc_id`; composing writes (e.g. a frame and its
    /// objects) are expected to be issued inside one transaction by the
    /// caller via `transaction`.
    async fn upsert_document(&self, collection: &str, doc_id: &str, fields: Value) -> StorageResult<()>;

    async fn delete_document(&self, collection: &str, doc_id: &str) -> StorageResult<()>;

    async fn list_documents(&self, collection: &str, parent_key: &str) -> StorageResult<Vec<Value>>;

    /// Execute a batch of upserts atomically.
    async fn transaction(&self, writes: Vec<(String, String, Value)>) -> StorageResult<()>;
}

#[derive(Debug, Clone, Default)]
struct Collection {
    docs: HashMap<String, Value>,
}

/// In-memory `RelationalClient` used by unit tests and local development.
#[derive(Default)]
pub struct InMemoryRelationalClient {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryRelationalClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationalClient for InMemoryRelationalClient {
    async fn ensure_schema(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn get_document(&self, collection: &str, doc_id: &str) -> StorageResult<Option<Value>> {
        let collections = self.collections.lock().expect("relational lock poisoned");
        Ok(collections.get(collection).and_then(|c| c.docs.get(doc_id).cloned()))
    }

    async fn upsert_document(&self, collection: &str, doc_id: &str, fields: Value) -> StorageResult<()> {
        let mut collections = self.collections.lock().expect("relational lock poisoned");
        collections.entry(collection.to_string()).or_default().docs.insert(doc_id.to_string(), fields);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> StorageResult<()> {
        let mut collections = self.collections.lock().expect("relational lock poisoned");
        if let Some(c) = collections.get_mut(collection) {
            c.docs.remove(doc_id);
        }
        Ok(())
    }

    async fn list_documents(&self, collection: &str, parent_key: &str) -> StorageResult<Vec<Value>> {
        let collections = self.collections.lock().expect("relational lock poisoned");
        let Some(c) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(c.docs
            .iter()
            .filter(|(id, _)| id.starts_with(parent_key))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn transaction(&self, writes: Vec<(String, String, Value)>) -> StorageResult<()> {
        let mut collections = self.collections.lock().expect("relational lock poisoned");
        for (collection, doc_id, fields) in writes {
            collections.entry(collection).or_default().docs.insert(doc_id, fields);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let client = InMemoryRelationalClient::new();
        client.upsert_document("jobs", "job-1", json!({"status": "active"})).await.unwrap();

        let doc = client.get_document("jobs", "job-1").await.unwrap();
        assert_eq!(doc, Some(json!({"status": "active"})));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let client = InMemoryRelationalClient::new();
        assert!(client.get_document("jobs", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_writes_all_documents() {
        let client = InMemoryRelationalClient::new();
        client
            .transaction(vec![
                ("frames".to_string(), "job-1:0".to_string(), json!({"frame_number": 0})),
                ("frames".to_string(), "job-1:1".to_string(), json!({"frame_number": 1})),
            ])
            .await
            .unwrap();

        let docs = client.list_documents("frames", "job-1:").await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let client = InMemoryRelationalClient::new();
        client.upsert_document("jobs", "job-1", json!({})).await.unwrap();
        client.delete_document("jobs", "job-1").await.unwrap();
        assert!(client.get_document("jobs", "job-1").await.unwrap().is_none());
    }
}
