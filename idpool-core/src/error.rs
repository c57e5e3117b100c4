//! Top-level error types for idpool.

use thiserror::Error;

use crate::exchange::ExchangeError;
use crate::queue::TaskQueueError;
use crate::store::StoreError;
use crate::validate::ValidationError;

/// Top-level error type encompassing all idpool errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from secure store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the identity-exchange service.
    #[error("service error: {0}")]
    Exchange(#[from] ExchangeError),

    /// Configuration error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The operation did not complete.
    #[error("internal error: {0}")]
    Queue(#[from] TaskQueueError),
}

impl AuthError {
    /// A hint for the user on how to recover.
    pub fn recovery_suggestion(&self) -> String {
        match self {
            AuthError::Store(StoreError::Decoding { .. }) => {
                "clear the cached credentials and fetch again".to_string()
            }
            AuthError::Store(StoreError::AccessDenied { .. })
            | AuthError::Store(StoreError::KeyringUnavailable { .. }) => {
                "check that the OS keyring is unlocked and accessible".to_string()
            }
            AuthError::Store(_) => "retry the operation; the secure store reported a failure".to_string(),
            AuthError::Exchange(e) if e.is_not_authorized() => {
                "sign in to the login provider again and fetch with the new token".to_string()
            }
            AuthError::Exchange(ExchangeError::Network { .. }) => {
                "check network connectivity and retry".to_string()
            }
            AuthError::Exchange(_) => "check the identity pool configuration and retry".to_string(),
            AuthError::Validation(e) => e.recovery.clone(),
            AuthError::Queue(_) => "retry the operation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_suggestion_from_validation() {
        let err = AuthError::from(ValidationError::new("owner key", "too long", "shorten it"));
        assert_eq!(err.recovery_suggestion(), "shorten it");
        assert_eq!(err.to_string(), "validation error: invalid owner key: too long");
    }

    #[test]
    fn test_recovery_suggestion_for_not_authorized() {
        let err = AuthError::from(ExchangeError::Service {
            kind: "NotAuthorizedException".into(),
            message: "Token expired".into(),
        });
        assert!(err.recovery_suggestion().contains("sign in"));
    }
}
