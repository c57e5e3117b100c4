//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use idpool_core::{
    CredentialCache, Credentials, DefaultIdentityPoolOperations, ExchangeError,
    IdentityExchange, IdentityPoolConfig, LoginProvider, LoginsMap, MemoryMarker, MemoryStore,
    OwnerScope,
};

pub const POOL_ID: &str = "us-east-1:11111111-2222-3333-4444-555555555555";
pub const OWNER_KEY: &str = "testOwner";

/// Exchange client that counts calls and issues numbered credentials.
#[derive(Default)]
pub struct MockExchange {
    get_id_calls: AtomicUsize,
    credential_calls: AtomicUsize,
    sent_identity_ids: Mutex<Vec<String>>,
    sent_logins: Mutex<Vec<LoginsMap>>,
    issued_identity_id: Option<String>,
    returned_identity_id: Option<String>,
    get_id_error: Option<ExchangeError>,
    credentials_error: Option<ExchangeError>,
    delay: Option<StdDuration>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity id returned by `get_id`.
    pub fn issuing_identity(mut self, identity_id: &str) -> Self {
        self.issued_identity_id = Some(identity_id.to_string());
        self
    }

    /// Identity id returned by `get_credentials_for_identity`, regardless of input.
    pub fn returning_identity(mut self, identity_id: &str) -> Self {
        self.returned_identity_id = Some(identity_id.to_string());
        self
    }

    pub fn failing_get_id(mut self, error: ExchangeError) -> Self {
        self.get_id_error = Some(error);
        self
    }

    pub fn failing_credentials(mut self, error: ExchangeError) -> Self {
        self.credentials_error = Some(error);
        self
    }

    /// Delay every call, to widen race windows.
    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_id_calls(&self) -> usize {
        self.get_id_calls.load(Ordering::SeqCst)
    }

    pub fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    pub fn sent_identity_ids(&self) -> Vec<String> {
        self.sent_identity_ids.lock().unwrap().clone()
    }

    pub fn sent_logins(&self) -> Vec<LoginsMap> {
        self.sent_logins.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl IdentityExchange for MockExchange {
    async fn get_id(&self, _pool_id: &str, logins: &LoginsMap) -> Result<String, ExchangeError> {
        self.get_id_calls.fetch_add(1, Ordering::SeqCst);
        self.sent_logins.lock().unwrap().push(logins.clone());
        self.pause().await;

        if let Some(e) = &self.get_id_error {
            return Err(e.clone());
        }
        Ok(self
            .issued_identity_id
            .clone()
            .unwrap_or_else(|| "us-east-1:issued-identity".to_string()))
    }

    async fn get_credentials_for_identity(
        &self,
        identity_id: &str,
        logins: &LoginsMap,
    ) -> Result<(Credentials, String), ExchangeError> {
        let n = self.credential_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent_identity_ids
            .lock()
            .unwrap()
            .push(identity_id.to_string());
        self.sent_logins.lock().unwrap().push(logins.clone());
        self.pause().await;

        if let Some(e) = &self.credentials_error {
            return Err(e.clone());
        }
        let identity_id = self
            .returned_identity_id
            .clone()
            .unwrap_or_else(|| identity_id.to_string());
        Ok((fresh_credentials(&format!("ASIAFRESHKEY{:04}", n)), identity_id))
    }
}

pub fn pool() -> IdentityPoolConfig {
    IdentityPoolConfig::new("us-east-1", POOL_ID).unwrap()
}

pub fn owner() -> OwnerScope {
    OwnerScope::with_default_version(OWNER_KEY).unwrap()
}

pub fn login(name: &str, token: &str) -> LoginProvider {
    LoginProvider::new(name, token)
}

pub fn fresh_credentials(access_key_id: &str) -> Credentials {
    Credentials::new(
        access_key_id,
        "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
        "FwoGZXIvYXdzEBYaDEXAMPLESESSIONTOKEN",
        Utc::now() + Duration::hours(1),
    )
}

pub fn expired_credentials(access_key_id: &str) -> Credentials {
    Credentials::new(
        access_key_id,
        "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
        "FwoGZXIvYXdzEBYaDEXAMPLESESSIONTOKEN",
        Utc::now() - Duration::minutes(1),
    )
}

/// Open a cache over `store` without the first-run purge.
pub async fn cache(store: Arc<MemoryStore>) -> CredentialCache<Arc<MemoryStore>> {
    CredentialCache::open(store, &pool(), &owner(), &MemoryMarker::configured()).await
}

/// Save a session directly into `store`.
pub async fn seed(
    store: &Arc<MemoryStore>,
    credentials: &Credentials,
    identity_id: &str,
    logins: &[LoginProvider],
) {
    cache(store.clone())
        .await
        .save(credentials, identity_id, logins)
        .await
        .unwrap();
}

/// Operations over a shared store and mock client.
pub async fn operations(
    store: Arc<MemoryStore>,
    client: Arc<MockExchange>,
) -> DefaultIdentityPoolOperations<Arc<MemoryStore>, Arc<MockExchange>> {
    DefaultIdentityPoolOperations::new(pool(), cache(store).await, client).unwrap()
}
