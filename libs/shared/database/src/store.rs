use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document store backend error: {0}")]
    Backend(String),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal document-store contract: JSON documents grouped in named
/// collections and addressed by a string key.
///
/// `put` replaces the whole document. `delete` of an absent key succeeds.
/// `list` makes no ordering promise.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
