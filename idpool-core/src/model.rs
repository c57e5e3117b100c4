//! Domain model types for idpool.
//!
//! This module defines the core types used throughout idpool:
//! - [`LoginProvider`] - A login provider name and the token it issued
//! - [`LoginsMap`] - The provider-name to token map sent to the exchange service
//! - [`IdentityPoolConfig`] - Region and pool id of the targeted identity pool
//! - [`OwnerScope`] - Key and version of the cache owner

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::mask::redacted;
use crate::validate::{ValidationError, check_owner, check_pool};

/// Provider name to provider token, as sent to the exchange service.
pub type LoginsMap = HashMap<String, String>;

/// A login provider used to federate into an identity pool.
///
/// `user_identifier` is the token issued by the provider (for OIDC providers,
/// the identity token). It is redacted from `Debug` output.
///
/// # Examples
///
/// ```
/// use idpool_core::LoginProvider;
///
/// let google = LoginProvider::new("accounts.google.com", "eyJhbGciOi...");
/// assert_eq!(google.name, "accounts.google.com");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProvider {
    /// The provider name registered with the identity pool.
    pub name: String,

    /// A token that identifies the user at the provider.
    pub user_identifier: String,
}

impl LoginProvider {
    /// Create a new login provider.
    pub fn new(name: impl Into<String>, user_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_identifier: user_identifier.into(),
        }
    }

    /// Parse a `NAME=TOKEN` pair.
    ///
    /// Returns `None` if there is no `=` or either side is empty.
    pub fn parse_pair(pair: &str) -> Option<Self> {
        let (name, token) = pair.split_once('=')?;
        if name.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self::new(name, token))
    }
}

impl fmt::Debug for LoginProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginProvider")
            .field("name", &self.name)
            .field("user_identifier", &redacted(&self.user_identifier))
            .finish()
    }
}

/// Build the exchange-service logins map.
///
/// Duplicate provider names overwrite earlier entries.
pub fn logins_map(logins: &[LoginProvider]) -> LoginsMap {
    let mut map = LoginsMap::with_capacity(logins.len());
    for login in logins {
        map.insert(login.name.clone(), login.user_identifier.clone());
    }
    map
}

/// The identity pool a coordinator targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPoolConfig {
    /// Region of the identity-exchange service.
    pub region: String,

    /// Identity pool id.
    pub pool_id: String,
}

impl IdentityPoolConfig {
    /// Create a pool configuration, validating both fields.
    pub fn new(
        region: impl Into<String>,
        pool_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            region: region.into(),
            pool_id: pool_id.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that region and pool id are usable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_pool(&self.region, &self.pool_id)
    }
}

/// The owner of a credential cache.
///
/// The key becomes the owner suffix of every cache key, so two owners sharing
/// a store never read each other's entries. The version is reported to the
/// exchange service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerScope {
    key: String,
    version: String,
}

impl OwnerScope {
    /// Default owner version.
    pub const DEFAULT_VERSION: &'static str = "1.0.0";

    /// Create an owner scope, validating key and version.
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        let version = version.into();
        check_owner(&key, &version)?;
        Ok(Self { key, version })
    }

    /// Create an owner scope with [`DEFAULT_VERSION`](Self::DEFAULT_VERSION).
    pub fn with_default_version(key: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(key, Self::DEFAULT_VERSION)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.key, self.version)
    }
}
