//! OS keyring-backed secure storage implementation.

use async_trait::async_trait;
use keyring::Entry;
use parking_lot::Mutex;

use super::{SecureStore, StoreError};

/// Account name of the entry that lists every key written by this store.
const INDEX_ACCOUNT: &str = "__idpool_index__";

/// OS keyring-backed secure store.
///
/// This store uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: Secret Service API (via libsecret)
/// - Windows: Credential Manager
///
/// # Storage Layout
///
/// Every value is a keyring entry with the store's service name and the key as
/// account name. Platform keyrings cannot enumerate entries, so the store keeps
/// an index entry listing the keys it wrote; [`remove_all`](SecureStore::remove_all)
/// walks that index.
///
/// # Example
///
/// ```rust,ignore
/// use idpool_core::store::{KeyringStore, SecureStore};
///
/// let store = KeyringStore::try_new("com.example.credentials").unwrap();
/// store.put_string("idpool.pool.owner.session.identityId", "id-1").await.unwrap();
/// ```
pub struct KeyringStore {
    service_name: String,
    index_lock: Mutex<()>,
}

impl KeyringStore {
    /// Try to create a new keyring store.
    ///
    /// Returns an error if the keyring backend is not available on this platform.
    pub fn try_new(service_name: &str) -> Result<Self, StoreError> {
        match Entry::new(service_name, "availability_check") {
            Ok(_) => Ok(Self {
                service_name: service_name.to_string(),
                index_lock: Mutex::new(()),
            }),
            Err(e) => Err(StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    /// Create a keyring entry for the given key.
    fn create_entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, key).map_err(|e| StoreError::BackendError {
            message: format!("failed to create keyring entry: {}", e),
        })
    }

    fn read_index(&self) -> Result<Vec<String>, StoreError> {
        let entry = self.create_entry(INDEX_ACCOUNT)?;
        match entry.get_secret() {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| StoreError::Decoding {
                key: INDEX_ACCOUNT.to_string(),
                message: e.to_string(),
            }),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(map_keyring_error(INDEX_ACCOUNT, e)),
        }
    }

    fn write_index(&self, keys: &[String]) -> Result<(), StoreError> {
        let entry = self.create_entry(INDEX_ACCOUNT)?;
        if keys.is_empty() {
            return delete_entry(&entry, INDEX_ACCOUNT);
        }
        let data = serde_json::to_vec(keys).map_err(|e| StoreError::Encoding {
            message: e.to_string(),
        })?;
        entry
            .set_secret(&data)
            .map_err(|e| map_keyring_error(INDEX_ACCOUNT, e))
    }
}

fn map_keyring_error(key: &str, error: keyring::Error) -> StoreError {
    match error {
        keyring::Error::NoEntry => StoreError::NotFound {
            key: key.to_string(),
        },
        keyring::Error::NoStorageAccess(e) => StoreError::AccessDenied {
            message: e.to_string(),
        },
        keyring::Error::Ambiguous(_) => StoreError::BackendError {
            message: format!("ambiguous keyring entry for key: {}", key),
        },
        keyring::Error::PlatformFailure(e) => StoreError::BackendError {
            message: format!("platform keyring failure: {}", e),
        },
        e => StoreError::BackendError {
            message: format!("keyring error: {}", e),
        },
    }
}

fn delete_entry(entry: &Entry, key: &str) -> Result<(), StoreError> {
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Idempotent delete
        Err(e) => Err(map_keyring_error(key, e)),
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[async_trait]
impl SecureStore for KeyringStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let entry = self.create_entry(key)?;
        entry.get_secret().map_err(|e| map_keyring_error(key, e))
    }

    async fn put_data(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let entry = self.create_entry(key)?;
        entry
            .set_secret(value)
            .map_err(|e| map_keyring_error(key, e))?;

        let _guard = self.index_lock.lock();
        let mut keys = self.read_index()?;
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            self.write_index(&keys)?;
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let entry = self.create_entry(key)?;
        delete_entry(&entry, key)?;

        let _guard = self.index_lock.lock();
        let mut keys = self.read_index()?;
        let before = keys.len();
        keys.retain(|k| k != key);
        if keys.len() != before {
            self.write_index(&keys)?;
        }
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        let _guard = self.index_lock.lock();
        let keys = self.read_index()?;
        for key in &keys {
            let entry = self.create_entry(key)?;
            delete_entry(&entry, key)?;
        }
        self.write_index(&[])?;
        tracing::debug!("Removed {} keyring entries for {}", keys.len(), self.service_name);
        Ok(())
    }
}
