//! Identity-exchange service abstraction.
//!
//! The exchange service turns login-provider tokens into an identity id and
//! temporary [`Credentials`]. [`IdentityExchange`] is the seam between the
//! refresh coordinator and whatever transport reaches the service; the
//! `http-exchange` feature provides [`HttpIdentityExchange`](crate::http::HttpIdentityExchange).

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::credentials::Credentials;
use crate::model::LoginsMap;

/// Error type for identity-exchange operations.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// The service rejected the request.
    #[error("{kind}: {message}")]
    Service { kind: String, message: String },

    /// The service answered, but a required field was missing or invalid.
    #[error("malformed service response: {message}")]
    MalformedResponse { message: String },

    /// The service could not be reached.
    #[error("network error: {message}")]
    Network { message: String },

    /// The client is misconfigured.
    #[error("client configuration error: {message}")]
    Configuration { message: String },
}

impl ExchangeError {
    /// Whether the service refused the presented logins.
    pub fn is_not_authorized(&self) -> bool {
        matches!(self, ExchangeError::Service { kind, .. } if kind == "NotAuthorizedException")
    }
}

/// Remote operations of the identity-exchange service.
///
/// # Example
///
/// ```rust,ignore
/// use idpool_core::{IdentityExchange, LoginsMap};
///
/// async fn resolve(client: &impl IdentityExchange, logins: &LoginsMap) {
///     let identity_id = client.get_id("us-east-1:pool", logins).await.unwrap();
///     let (credentials, identity_id) = client
///         .get_credentials_for_identity(&identity_id, logins)
///         .await
///         .unwrap();
/// }
/// ```
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// Resolve the identity id for `logins` in the given pool.
    ///
    /// An empty map requests an unauthenticated identity.
    async fn get_id(&self, pool_id: &str, logins: &LoginsMap) -> Result<String, ExchangeError>;

    /// Resolve temporary credentials for an identity.
    ///
    /// The returned identity id may differ from `identity_id` and is the one
    /// callers must keep.
    async fn get_credentials_for_identity(
        &self,
        identity_id: &str,
        logins: &LoginsMap,
    ) -> Result<(Credentials, String), ExchangeError>;
}

#[async_trait]
impl<T: IdentityExchange + ?Sized> IdentityExchange for Arc<T> {
    async fn get_id(&self, pool_id: &str, logins: &LoginsMap) -> Result<String, ExchangeError> {
        (**self).get_id(pool_id, logins).await
    }

    async fn get_credentials_for_identity(
        &self,
        identity_id: &str,
        logins: &LoginsMap,
    ) -> Result<(Credentials, String), ExchangeError> {
        (**self)
            .get_credentials_for_identity(identity_id, logins)
            .await
    }
}
