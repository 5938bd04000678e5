use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::provider::store::{Predicate, ProfileStore, StoreError};

fn matches(doc: &Value, filters: &[Predicate]) -> bool {
    filters.iter().all(|p| doc.get(&p.field) == Some(&p.value))
}

/// In-process document store keyed collection -> key -> JSON object.
/// Iteration order inside a collection is by key, which keeps query results
/// deterministic.
#[derive(Default)]
pub struct MemoryProfileStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn set(&self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), doc);
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: Value) -> Result<(), StoreError> {
        let new_fields = match fields {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::Unavailable(
                    "update payload must be an object".into(),
                ))
            }
        };
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(key))
            .ok_or(StoreError::NotFound)?;
        match doc {
            Value::Object(map) => {
                for (k, v) in new_fields {
                    map.insert(k, v);
                }
            }
            other => *other = Value::Object(new_fields),
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Predicate],
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| matches(doc, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct Faults {
    collections: HashSet<String>,
    write_matches: Vec<(String, Value)>,
}

impl Faults {
    fn denies_collection(&self, collection: &str) -> bool {
        self.collections.contains(collection)
    }

    fn denies_write(&self, collection: &str, doc: &Value) -> bool {
        self.denies_collection(collection)
            || self
                .write_matches
                .iter()
                .any(|(field, value)| doc.get(field) == Some(value))
    }
}

fn injected() -> StoreError {
    StoreError::Unavailable("injected fault".into())
}

/// Deterministic fault injection around any [`ProfileStore`]. Used by tests
/// to exercise partial batch writes, two-phase create recovery, and
/// fail-closed resolution.
pub struct FaultyStore<S> {
    inner: S,
    faults: RwLock<Faults>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: RwLock::new(Faults::default()),
        }
    }

    /// Denies every operation touching `collection`.
    pub async fn fail_collection(&self, collection: &str) {
        self.faults
            .write()
            .await
            .collections
            .insert(collection.to_string());
    }

    /// Denies `set` calls whose document carries `field == value`.
    pub async fn fail_writes_matching(&self, field: &str, value: impl Into<Value>) {
        self.faults
            .write()
            .await
            .write_matches
            .push((field.to_string(), value.into()));
    }

    pub async fn clear_faults(&self) {
        let mut faults = self.faults.write().await;
        faults.collections.clear();
        faults.write_matches.clear();
    }
}

#[async_trait]
impl<S: ProfileStore> ProfileStore for FaultyStore<S> {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        if self.faults.read().await.denies_collection(collection) {
            return Err(injected());
        }
        self.inner.get(collection, key).await
    }

    async fn set(&self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        if self.faults.read().await.denies_write(collection, &doc) {
            return Err(injected());
        }
        self.inner.set(collection, key, doc).await
    }

    async fn update(&self, collection: &str, key: &str, fields: Value) -> Result<(), StoreError> {
        if self.faults.read().await.denies_collection(collection) {
            return Err(injected());
        }
        self.inner.update(collection, key, fields).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Predicate],
    ) -> Result<Vec<Value>, StoreError> {
        if self.faults.read().await.denies_collection(collection) {
            return Err(injected());
        }
        self.inner.query(collection, filters).await
    }
}
