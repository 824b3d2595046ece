use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{DocumentStore, StoreError};

/// Process-local store. Used when no external database is configured and by
/// the test suites.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        debug!("Storing document {}/{}", collection, id);
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        debug!("Deleting document {}/{}", collection, id);
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_replaces_whole_document() {
        let store = InMemoryDocumentStore::new();
        store.put("patients", "a", json!({"name": "Ana", "age": 54})).await.unwrap();
        store.put("patients", "a", json!({"name": "Ana"})).await.unwrap();

        let doc = store.get("patients", "a").await.unwrap().unwrap();
        assert_eq!(doc, json!({"name": "Ana"}));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryDocumentStore::new();
        store.put("patients", "a", json!({})).await.unwrap();

        assert!(store.get("other", "a").await.unwrap().is_none());
        assert!(store.list("other").await.unwrap().is_empty());
        assert_eq!(store.list("patients").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let store = InMemoryDocumentStore::new();
        assert!(store.delete("patients", "missing").await.is_ok());

        store.put("patients", "a", json!({})).await.unwrap();
        store.delete("patients", "a").await.unwrap();
        assert!(store.get("patients", "a").await.unwrap().is_none());
    }
}
