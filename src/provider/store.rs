use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Equality filter for [`ProfileStore::query`]. The store contract supports
/// nothing richer; range filtering happens in memory on the caller's side.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("document not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Hosted document store. Documents are JSON objects grouped into named
/// collections and addressed by a string key.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Full-document upsert.
    async fn set(&self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError>;

    /// Merges `fields` into an existing document. [`StoreError::NotFound`]
    /// when the document does not exist.
    async fn update(&self, collection: &str, key: &str, fields: Value) -> Result<(), StoreError>;

    /// All documents matching every predicate. No ordering guarantee.
    async fn query(&self, collection: &str, filters: &[Predicate])
        -> Result<Vec<Value>, StoreError>;
}
