//! In-memory store.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{KeyValueStore, StoreError, StoreMap, select};

/// Process-local store, used for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries(entries: StoreMap) -> Self {
        Self {
            data: RwLock::new(entries),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> StoreMap {
        self.data.read().clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        Ok(select(&self.data.read(), keys))
    }

    async fn set(&self, items: StoreMap) -> Result<(), StoreError> {
        self.data.write().extend(items);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut data = self.data.write();
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}
