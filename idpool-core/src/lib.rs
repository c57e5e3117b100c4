//! # idpool Core
//!
//! Credential cache and refresh coordination for federated identity pools.
//!
//! This crate provides:
//! - Domain types for login providers, credentials, and pool configuration
//! - A persistent session cache on top of a secure key-value store
//! - A refresh coordinator that reuses cached credentials while valid and
//!   serializes every refresh through a single-flight queue
//! - In-memory and (optionally) keyring-based storage implementations
//! - An HTTP identity-exchange client (with the `http-exchange` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use idpool_core::{IdentityPoolOperations, LoginProvider};
//!
//! async fn credentials(operations: &impl IdentityPoolOperations, id_token: &str) {
//!     let logins = vec![LoginProvider::new("accounts.google.com", id_token)];
//!     let details = operations.fetch_identity_pool_details(&logins, false).await;
//!     match details.credentials() {
//!         Ok(credentials) => println!("expires at {}", credentials.expiration()),
//!         Err(e) => eprintln!("fetch failed: {}", e),
//!     }
//! }
//! ```

pub mod cache;
pub mod credentials;
pub mod error;
pub mod event;
pub mod exchange;
pub mod marker;
pub mod mask;
pub mod model;
pub mod operations;
pub mod queue;
pub mod store;
pub mod validate;

#[cfg(feature = "http-exchange")]
pub mod http;

// Re-export commonly used types at crate root
pub use model::{
    IdentityPoolConfig,
    LoginProvider,
    LoginsMap,
    OwnerScope,
};

pub use credentials::Credentials;

pub use store::{
    SecureStore,
    StoreError,
    MemoryStore,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use marker::{
    FileMarker,
    MemoryMarker,
    StoreMarker,
};

pub use cache::{
    CachedSession,
    CredentialCache,
};

pub use exchange::{
    ExchangeError,
    IdentityExchange,
};

pub use operations::{
    DefaultIdentityPoolOperations,
    FetchResult,
    IdentityPoolOperations,
    RefreshReason,
};

pub use event::{
    AuthEvent,
    AuthEventEmitter,
};

pub use error::AuthError;
pub use validate::ValidationError;

#[cfg(feature = "http-exchange")]
pub use http::HttpIdentityExchange;
