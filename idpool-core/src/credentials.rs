//! Temporary access credentials issued by the identity-exchange service.
//!
//! This module provides:
//! - [`Credentials`] - An immutable credential set with masked debug output
//! - [`RawCredentials`] - The all-optional shape a service response arrives in

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::exchange::ExchangeError;
use crate::mask::mask_credential;

/// Temporary access credentials.
///
/// None of the secret fields ever appear in `Debug` output in plain form;
/// each is masked to its first and last two characters. The secret strings
/// are zeroed when the value is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    #[zeroize(skip)]
    expiration: DateTime<Utc>,
}

impl Credentials {
    /// Create a credential set.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration,
        }
    }

    /// The access key id. Never log this value.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key. Never log this value.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// The session token. Never log this value.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// When the credentials stop being accepted by the service.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Check whether the credentials are expired at `now`.
    ///
    /// Credentials expiring within `buffer` of `now` count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.expiration <= now + buffer
    }

    /// Check whether the credentials are expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now(), Duration::zero())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &mask_credential(&self.access_key_id))
            .field("secret_access_key", &mask_credential(&self.secret_access_key))
            .field("session_token", &mask_credential(&self.session_token))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Credential fields as reported by the service, any of which may be absent.
#[derive(Default)]
pub struct RawCredentials {
    pub access_key_id: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

impl TryFrom<RawCredentials> for Credentials {
    type Error = ExchangeError;

    fn try_from(raw: RawCredentials) -> Result<Self, Self::Error> {
        match raw {
            RawCredentials {
                access_key_id: Some(access_key_id),
                secret_key: Some(secret_key),
                session_token: Some(session_token),
                expiration: Some(expiration),
            } => Ok(Credentials::new(
                access_key_id,
                secret_key,
                session_token,
                expiration,
            )),
            _ => Err(ExchangeError::MalformedResponse {
                message: "empty elements in identity credentials".to_string(),
            }),
        }
    }
}
