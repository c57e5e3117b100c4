//! Identity-pool credential operations.
//!
//! This module provides [`DefaultIdentityPoolOperations`], which exchanges
//! login-provider tokens for temporary [`Credentials`] and an identity id,
//! caches the result, and reuses it while it stays valid.
//!
//! # Refresh rules
//!
//! A cached session is reused only if the presented logins equal the saved
//! ones, the credentials have not expired, and no refresh was forced.
//! Otherwise the credentials are refreshed for the *saved* identity id, which
//! lets the service elevate an unauthenticated identity once logins appear.
//! With nothing cached, a new identity id is resolved first.
//!
//! Every fetch and clear runs through a [`TaskQueue`], so concurrent callers
//! never trigger redundant exchanges or interleave cache writes.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "http-exchange")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use idpool_core::{
//!     DefaultIdentityPoolOperations, HttpIdentityExchange, IdentityPoolConfig,
//!     IdentityPoolOperations, LoginProvider, MemoryMarker, MemoryStore, OwnerScope,
//! };
//!
//! let pool = IdentityPoolConfig::new("us-east-1", "us-east-1:00000000-0000-0000-0000-000000000000")?;
//! let owner = OwnerScope::with_default_version("myapp")?;
//! let client = HttpIdentityExchange::new(&pool, &owner)?;
//! let operations = DefaultIdentityPoolOperations::open(
//!     pool,
//!     &owner,
//!     MemoryStore::new(),
//!     &MemoryMarker::new(),
//!     client,
//! )
//! .await?;
//!
//! let logins = vec![LoginProvider::new("accounts.google.com", "<id token>")];
//! let details = operations.fetch_identity_pool_details(&logins, false).await;
//! let credentials = details.credentials()?;
//! println!("{:?}", credentials);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

use crate::cache::{CachedSession, CredentialCache};
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::exchange::IdentityExchange;
use crate::marker::StoreMarker;
use crate::model::{IdentityPoolConfig, LoginProvider, LoginsMap, OwnerScope, logins_map};
use crate::queue::TaskQueue;
use crate::store::SecureStore;

/// Outcome of one fetch attempt.
///
/// Credentials and identity id always come from the same attempt: either both
/// are present or both projections return the same error.
#[derive(Debug, Clone)]
pub enum FetchResult {
    Success {
        credentials: Credentials,
        identity_id: String,
    },
    Failure(Arc<AuthError>),
}

impl FetchResult {
    fn failure(error: impl Into<AuthError>) -> Self {
        FetchResult::Failure(Arc::new(error.into()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// The error of a failed attempt.
    pub fn error(&self) -> Option<&Arc<AuthError>> {
        match self {
            FetchResult::Success { .. } => None,
            FetchResult::Failure(e) => Some(e),
        }
    }

    /// The credentials outcome.
    ///
    /// There is no guarantee the credentials are unexpired by the time they
    /// are used.
    pub fn credentials(&self) -> Result<&Credentials, Arc<AuthError>> {
        match self {
            FetchResult::Success { credentials, .. } => Ok(credentials),
            FetchResult::Failure(e) => Err(e.clone()),
        }
    }

    /// The identity id outcome.
    pub fn identity_id(&self) -> Result<&str, Arc<AuthError>> {
        match self {
            FetchResult::Success { identity_id, .. } => Ok(identity_id),
            FetchResult::Failure(e) => Err(e.clone()),
        }
    }

    /// Split into the credentials outcome and the identity id outcome.
    pub fn into_results(
        self,
    ) -> (
        Result<Credentials, Arc<AuthError>>,
        Result<String, Arc<AuthError>>,
    ) {
        match self {
            FetchResult::Success {
                credentials,
                identity_id,
            } => (Ok(credentials), Ok(identity_id)),
            FetchResult::Failure(e) => (Err(e.clone()), Err(e)),
        }
    }
}

/// Why a cached session could not be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// The presented logins differ from the saved ones.
    LoginsChanged,
    /// The saved credentials have expired.
    Expired,
    /// The caller asked for a refresh.
    Forced,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RefreshReason::LoginsChanged => "logins changed",
            RefreshReason::Expired => "credentials expired",
            RefreshReason::Forced => "refresh forced",
        };
        f.write_str(reason)
    }
}

/// Decide whether `session` can be reused for `logins`.
///
/// Returns `None` when it can. Logins are compared as persisted, so a
/// reordered list counts as a change.
pub fn refresh_reason(
    session: &CachedSession,
    logins: &[LoginProvider],
    force_refresh: bool,
    now: DateTime<Utc>,
    expiry_buffer: Duration,
) -> Option<RefreshReason> {
    if session.logins.as_slice() != logins {
        Some(RefreshReason::LoginsChanged)
    } else if session.credentials.is_expired_at(now, expiry_buffer) {
        Some(RefreshReason::Expired)
    } else if force_refresh {
        Some(RefreshReason::Forced)
    } else {
        None
    }
}

/// Fetching and clearing identity-pool credentials.
#[async_trait]
pub trait IdentityPoolOperations: Send + Sync {
    /// Fetch credentials and identity id for `logins`.
    ///
    /// Pass an empty slice for an unauthenticated identity. Never fails
    /// outright; errors are reported through the returned [`FetchResult`].
    async fn fetch_identity_pool_details(
        &self,
        logins: &[LoginProvider],
        force_refresh: bool,
    ) -> FetchResult;

    /// Delete the cached credentials and identity id.
    ///
    /// Succeeds when nothing was cached.
    async fn clear_credentials(&self) -> Result<(), AuthError>;
}

struct Inner<S, C> {
    pool: IdentityPoolConfig,
    cache: CredentialCache<S>,
    client: C,
}

/// Default implementation of [`IdentityPoolOperations`].
///
/// # Type Parameters
///
/// * `S` - The secure store backing the credential cache
/// * `C` - The identity-exchange client
pub struct DefaultIdentityPoolOperations<S, C> {
    inner: Arc<Inner<S, C>>,
    queue: TaskQueue,
    expiry_buffer: Duration,
}

impl<S, C> DefaultIdentityPoolOperations<S, C>
where
    S: SecureStore + 'static,
    C: IdentityExchange + 'static,
{
    /// Create operations over an already opened cache.
    pub fn new(
        pool: IdentityPoolConfig,
        cache: CredentialCache<S>,
        client: C,
    ) -> Result<Self, AuthError> {
        pool.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                pool,
                cache,
                client,
            }),
            queue: TaskQueue::new(),
            expiry_buffer: Duration::zero(),
        })
    }

    /// Open the credential cache for `owner` in `store` and create operations.
    ///
    /// See [`CredentialCache::open`] for the first-run purge driven by `marker`.
    pub async fn open(
        pool: IdentityPoolConfig,
        owner: &OwnerScope,
        store: S,
        marker: &dyn StoreMarker,
        client: C,
    ) -> Result<Self, AuthError> {
        pool.validate()?;
        let cache = CredentialCache::open(store, &pool, owner, marker).await;
        Self::new(pool, cache, client)
    }

    /// Treat credentials expiring within `buffer` as already expired.
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn pool(&self) -> &IdentityPoolConfig {
        &self.inner.pool
    }
}

impl<S: SecureStore, C: IdentityExchange> Inner<S, C> {
    async fn fetch(
        &self,
        logins: Vec<LoginProvider>,
        force_refresh: bool,
        expiry_buffer: Duration,
    ) -> FetchResult {
        let logins_map = logins_map(&logins);

        match self.cache.load().await {
            Ok(session) => {
                match refresh_reason(&session, &logins, force_refresh, Utc::now(), expiry_buffer) {
                    None => {
                        tracing::debug!(
                            "Using cached credentials for identity {}",
                            session.identity_id
                        );
                        let CachedSession {
                            credentials,
                            identity_id,
                            ..
                        } = session;
                        FetchResult::Success {
                            credentials,
                            identity_id,
                        }
                    }
                    Some(reason) => {
                        tracing::info!(
                            "Refreshing credentials for identity {} ({})",
                            session.identity_id,
                            reason
                        );
                        self.refresh(&session.identity_id, &logins_map, &logins)
                            .await
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "No cached session for pool {}, resolving identity",
                    self.pool.pool_id
                );
                match self.client.get_id(&self.pool.pool_id, &logins_map).await {
                    Ok(identity_id) => self.refresh(&identity_id, &logins_map, &logins).await,
                    Err(e) => {
                        tracing::error!("Failed to resolve identity id: {}", e);
                        FetchResult::failure(e)
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to read cached session: {}", e);
                FetchResult::failure(e)
            }
        }
    }

    async fn refresh(
        &self,
        identity_id: &str,
        logins_map: &LoginsMap,
        logins: &[LoginProvider],
    ) -> FetchResult {
        let (credentials, identity_id) = match self
            .client
            .get_credentials_for_identity(identity_id, logins_map)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Failed to fetch credentials for identity {}: {}", identity_id, e);
                return FetchResult::failure(e);
            }
        };

        if let Err(e) = self.cache.save(&credentials, &identity_id, logins).await {
            tracing::error!("Failed to save session for identity {}: {}", identity_id, e);
            return FetchResult::failure(e);
        }

        tracing::info!(
            "Fetched credentials for identity {}, expiring at {}",
            identity_id,
            credentials.expiration()
        );
        FetchResult::Success {
            credentials,
            identity_id,
        }
    }
}

#[async_trait]
impl<S, C> IdentityPoolOperations for DefaultIdentityPoolOperations<S, C>
where
    S: SecureStore + 'static,
    C: IdentityExchange + 'static,
{
    async fn fetch_identity_pool_details(
        &self,
        logins: &[LoginProvider],
        force_refresh: bool,
    ) -> FetchResult {
        let inner = self.inner.clone();
        let logins = logins.to_vec();
        let expiry_buffer = self.expiry_buffer;

        match self
            .queue
            .sync(async move { inner.fetch(logins, force_refresh, expiry_buffer).await })
            .await
        {
            Ok(result) => result,
            Err(e) => FetchResult::failure(e),
        }
    }

    async fn clear_credentials(&self) -> Result<(), AuthError> {
        let inner = self.inner.clone();
        self.queue
            .sync(async move { inner.cache.clear().await })
            .await??;

        tracing::info!("Cleared cached credentials for pool {}", self.inner.pool.pool_id);
        Ok(())
    }
}
