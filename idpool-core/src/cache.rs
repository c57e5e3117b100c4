//! Persistent cache of the identity-pool session.
//!
//! A session is the triple of [`Credentials`], identity id, and the login
//! providers that produced them. Each field lives under its own key in a
//! [`SecureStore`]:
//!
//! ```text
//! idpool.<pool id>.<owner key>.session.credential      JSON credentials
//! idpool.<pool id>.<owner key>.session.identityId      identity id string
//! idpool.<pool id>.<owner key>.session.loginsProvider  JSON login provider list
//! ```
//!
//! The three fields are always written and read together. A missing field
//! means there is no cached session.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::credentials::Credentials;
use crate::marker::StoreMarker;
use crate::model::{IdentityPoolConfig, LoginProvider, OwnerScope};
use crate::store::{SecureStore, StoreError};

/// Keyring service name shared by every identity-pool credential cache.
pub const STORE_SERVICE: &str = "com.idpool.identityPoolCredentialStore";

/// Namespace at the root of every cache key.
pub const KEY_NAMESPACE: &str = "idpool";

/// A cached session as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub credentials: Credentials,
    pub identity_id: String,
    pub logins: Vec<LoginProvider>,
}

/// The store keys of one owner's session in one identity pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    credential: String,
    identity_id: String,
    logins_provider: String,
}

impl SessionKeys {
    /// Derive the keys for `pool_id` and `owner_key`.
    pub fn new(pool_id: &str, owner_key: &str) -> Self {
        let session = session_prefix(pool_id, owner_key);
        Self {
            credential: format!("{}.credential", session),
            identity_id: format!("{}.identityId", session),
            logins_provider: format!("{}.loginsProvider", session),
        }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    pub fn logins_provider(&self) -> &str {
        &self.logins_provider
    }
}

/// Root of every key owned by `owner_key` in `pool_id`.
pub fn root_prefix(pool_id: &str, owner_key: &str) -> String {
    format!("{}.{}.{}", KEY_NAMESPACE, pool_id, owner_key)
}

/// Prefix of the session keys owned by `owner_key` in `pool_id`.
pub fn session_prefix(pool_id: &str, owner_key: &str) -> String {
    format!("{}.session", root_prefix(pool_id, owner_key))
}

/// Session cache on top of a [`SecureStore`].
///
/// The cache does not serialize access itself; callers that share one cache
/// between tasks must order their operations (the refresh coordinator runs
/// every cache operation through its task queue).
pub struct CredentialCache<S> {
    store: S,
    keys: SessionKeys,
}

impl<S: SecureStore> CredentialCache<S> {
    /// Open the cache for `owner` in `pool`.
    ///
    /// If `marker` records that the store was never initialized, every entry
    /// in the store is purged once, for all owners, and the marker is set.
    /// Failures of either step are logged and do not prevent opening.
    pub async fn open(
        store: S,
        pool: &IdentityPoolConfig,
        owner: &OwnerScope,
        marker: &dyn StoreMarker,
    ) -> Self {
        if !marker.is_configured() {
            tracing::info!("Secure store was not initialized by this install, purging stale entries");
            if let Err(e) = store.remove_all().await {
                tracing::warn!("Failed to purge stale secure store entries: {}", e);
            }
            if let Err(e) = marker.mark_configured() {
                tracing::warn!("Failed to record secure store initialization: {}", e);
            }
        }

        Self {
            store,
            keys: SessionKeys::new(&pool.pool_id, owner.key()),
        }
    }

    /// The keys this cache reads and writes.
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Persist a session, overwriting any previous one.
    ///
    /// If a write fails part-way, the session is cleared so that fields from
    /// two different sessions are never loaded together.
    pub async fn save(
        &self,
        credentials: &Credentials,
        identity_id: &str,
        logins: &[LoginProvider],
    ) -> Result<(), StoreError> {
        let encoded_credentials = encode(credentials)?;
        let encoded_logins = encode(&logins)?;

        if let Err(e) = self
            .write_fields(&encoded_credentials, identity_id, &encoded_logins)
            .await
        {
            if let Err(clear_err) = self.clear().await {
                tracing::warn!(
                    "Failed to clear partially saved session under {}: {}",
                    self.keys.credential,
                    clear_err
                );
            }
            return Err(e);
        }

        tracing::debug!("Saved identity pool session under {}", self.keys.credential);
        Ok(())
    }

    async fn write_fields(
        &self,
        credentials: &[u8],
        identity_id: &str,
        logins: &[u8],
    ) -> Result<(), StoreError> {
        self.store
            .put_data(&self.keys.credential, credentials)
            .await?;
        self.store
            .put_string(&self.keys.identity_id, identity_id)
            .await?;
        self.store
            .put_data(&self.keys.logins_provider, logins)
            .await
    }

    /// Load the cached session.
    ///
    /// Fails with [`StoreError::NotFound`] if any of the three fields is
    /// missing and [`StoreError::Decoding`] if a field is malformed. Malformed
    /// entries are left in place.
    pub async fn load(&self) -> Result<CachedSession, StoreError> {
        let credential_data = self.store.get_data(&self.keys.credential).await?;
        let credentials: Credentials = decode(&self.keys.credential, &credential_data)?;

        let identity_id = self.store.get_string(&self.keys.identity_id).await?;

        let logins_data = self.store.get_data(&self.keys.logins_provider).await?;
        let logins: Vec<LoginProvider> = decode(&self.keys.logins_provider, &logins_data)?;

        Ok(CachedSession {
            credentials,
            identity_id,
            logins,
        })
    }

    /// Delete this owner's session.
    ///
    /// Succeeds when nothing was cached.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.keys.credential).await?;
        self.store.remove(&self.keys.identity_id).await?;
        self.store.remove(&self.keys.logins_provider).await?;
        tracing::debug!("Cleared identity pool session under {}", self.keys.credential);
        Ok(())
    }
}

fn encode(value: &impl Serialize) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Encoding {
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(key: &str, data: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(data).map_err(|e| StoreError::Decoding {
        key: key.to_string(),
        message: e.to_string(),
    })
}
