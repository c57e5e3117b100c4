//! In-memory secure storage implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{SecureStore, StoreError};

/// In-memory secure store for testing and development.
///
/// This store is not persistent; data is lost when the process exits.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys_count", &self.len())
            .finish()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::BackendError {
        message: format!("lock poisoned: {}", e),
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let data = self.data.read().map_err(poisoned)?;
        data.get(key).cloned().ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn put_data(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.remove(key);
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_put_get() {
        let store = MemoryStore::new();

        store.put_data("test-key", b"test-value").await.unwrap();
        let retrieved = store.get_data("test-key").await.unwrap();

        assert_eq!(retrieved, b"test-value");
    }

    #[tokio::test]
    async fn test_memory_store_get_nonexistent() {
        let store = MemoryStore::new();
        let result = store.get_data("nonexistent").await;
        assert!(matches!(result, Err(StoreError::NotFound { key }) if key == "nonexistent"));
    }

    #[tokio::test]
    async fn test_memory_store_remove_is_idempotent() {
        let store = MemoryStore::new();

        store.put_string("test-key", "test-value").await.unwrap();
        store.remove("test-key").await.unwrap();
        store.remove("test-key").await.unwrap();

        assert!(!store.exists("test-key").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_remove_all() {
        let store = MemoryStore::new();

        store.put_string("a", "1").await.unwrap();
        store.put_string("b", "2").await.unwrap();
        assert_eq!(store.len(), 2);

        store.remove_all().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_overwrite() {
        let store = MemoryStore::new();

        store.put_string("key", "old").await.unwrap();
        store.put_string("key", "new").await.unwrap();

        assert_eq!(store.get_string("key").await.unwrap(), "new");
        assert_eq!(store.len(), 1);
    }
}
