//! Secure key-value storage abstraction.
//!
//! This module provides:
//! - [`SecureStore`] - Trait for secure storage backends
//! - [`StoreError`] - Errors raised by storage backends
//! - [`MemoryStore`] - In-memory implementation for testing
//! - [`KeyringStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`create_store`] - Helper to select backend based on availability
//!
//! # Example
//!
//! ```rust,ignore
//! use idpool_core::store::{SecureStore, create_store};
//!
//! let store = create_store(true, "com.example.credentials"); // Prefer keyring if available
//!
//! store.put_string("idpool.pool.owner.session.identityId", "id-1").await.unwrap();
//! let identity_id = store.get_string("idpool.pool.owner.session.identityId").await.unwrap();
//! assert_eq!(identity_id, "id-1");
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use memory::MemoryStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;

/// Error type for secure store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No value is stored under the key.
    #[error("item not found: {key}")]
    NotFound { key: String },

    /// A stored value could not be decoded into its expected shape.
    #[error("could not decode value stored at {key}: {message}")]
    Decoding { key: String, message: String },

    /// A value could not be encoded for storage.
    #[error("could not encode value: {message}")]
    Encoding { message: String },

    /// Access to the store was denied.
    #[error("access denied to secure store: {message}")]
    AccessDenied { message: String },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },
}

impl StoreError {
    /// Whether this error means "nothing stored", as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Abstraction over secure storage backends.
///
/// Values are opaque bytes; strings are stored as UTF-8. Implementations
/// include:
/// - [`MemoryStore`] - In-memory storage for testing
/// - [`KeyringStore`] (with `keyring-store` feature) - OS keyring
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Retrieve the bytes stored at `key`.
    ///
    /// Returns [`StoreError::NotFound`] if the key doesn't exist.
    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Store bytes at the given key, overwriting any existing value.
    async fn put_data(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete the value at `key`.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Delete every value in the store.
    async fn remove_all(&self) -> Result<(), StoreError>;

    /// Retrieve a UTF-8 string stored at `key`.
    async fn get_string(&self, key: &str) -> Result<String, StoreError> {
        let data = self.get_data(key).await?;
        String::from_utf8(data).map_err(|e| StoreError::Decoding {
            key: key.to_string(),
            message: format!("stored value is not valid UTF-8: {}", e),
        })
    }

    /// Store a string at the given key.
    async fn put_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.put_data(key, value.as_bytes()).await
    }

    /// Whether values outlive the process.
    fn is_persistent(&self) -> bool {
        false
    }

    /// Check if a key exists without keeping the value.
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.get_data(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<T: SecureStore + ?Sized> SecureStore for Arc<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        (**self).get_data(key).await
    }

    async fn put_data(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put_data(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        (**self).remove_all().await
    }
}

#[async_trait]
impl<T: SecureStore + ?Sized> SecureStore for Box<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        (**self).get_data(key).await
    }

    async fn put_data(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put_data(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        (**self).remove_all().await
    }
}

/// Create a secure store with automatic backend selection.
///
/// This helper function selects the best available backend based on:
/// 1. Feature flags (whether `keyring-store` is enabled)
/// 2. Runtime availability (whether the keyring is accessible)
/// 3. User preference (the `prefer_keyring` parameter)
///
/// # Backend Selection Logic
///
/// - If `prefer_keyring` is `true` and the `keyring-store` feature is enabled:
///   - Attempts to create a [`KeyringStore`] for `service`
///   - Falls back to [`MemoryStore`] with a warning if keyring is unavailable
/// - Otherwise: Returns [`MemoryStore`]
pub fn create_store(prefer_keyring: bool, service: &str) -> Box<dyn SecureStore> {
    #[cfg(feature = "keyring-store")]
    if prefer_keyring {
        match KeyringStore::try_new(service) {
            Ok(store) => {
                tracing::info!("Using OS keyring for credential storage");
                return Box::new(store);
            }
            Err(e) => {
                tracing::warn!(
                    "Keyring unavailable ({}), falling back to memory store. \
                     Credentials will not persist across restarts.",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    if prefer_keyring {
        tracing::warn!(
            "Keyring storage requested for {} but keyring-store feature not enabled. \
             Using memory store. Credentials will not persist across restarts.",
            service
        );
    }

    tracing::debug!("Using in-memory credential storage");
    Box::new(MemoryStore::new())
}
