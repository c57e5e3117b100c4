//! Construction-time validation of owner and pool configuration.

use thiserror::Error;

/// Maximum length of an owner key.
pub const MAX_OWNER_KEY_LEN: usize = 25;

/// Maximum length of an owner version.
pub const MAX_OWNER_VERSION_LEN: usize = 10;

/// A configuration value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// The configuration field that was rejected.
    pub field: String,

    /// What is wrong with the value.
    pub message: String,

    /// How to fix it.
    pub recovery: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        recovery: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            recovery: recovery.into(),
        }
    }
}

/// Validate an owner key and version pair.
///
/// The key partitions cache entries and must be 1-25 ASCII alphanumeric
/// characters. The version must be 1-10 characters of the form
/// `<major>.<minor>.<patch>`.
pub fn check_owner(key: &str, version: &str) -> Result<(), ValidationError> {
    if key.is_empty() || version.is_empty() {
        return Err(ValidationError::new(
            "owner key/version",
            "owner key or version is empty",
            "provide a non-empty owner key and version",
        ));
    }

    if key.chars().count() > MAX_OWNER_KEY_LEN {
        return Err(ValidationError::new(
            "owner key",
            "owner key is too long",
            "the owner key should contain between 1-25 characters",
        ));
    }

    if version.chars().count() > MAX_OWNER_VERSION_LEN {
        return Err(ValidationError::new(
            "owner version",
            "owner version is too long",
            "the owner version should contain between 1-10 characters",
        ));
    }

    if !is_alphanumeric(key) {
        return Err(ValidationError::new(
            "owner key",
            "owner key contains invalid characters",
            "the owner key should contain only alphanumeric characters",
        ));
    }

    if !is_semantic_version(version) {
        return Err(ValidationError::new(
            "owner version",
            "owner version contains invalid pattern",
            "the owner version should follow semantic versioning <major>.<minor>.<patch>",
        ));
    }

    Ok(())
}

/// Validate identity pool coordinates.
pub fn check_pool(region: &str, pool_id: &str) -> Result<(), ValidationError> {
    if region.trim().is_empty() {
        return Err(ValidationError::new(
            "region",
            "region is empty",
            "set the region the identity pool lives in",
        ));
    }

    if pool_id.trim().is_empty() {
        return Err(ValidationError::new(
            "pool id",
            "identity pool id is empty",
            "set the identity pool id, e.g. us-east-1:00000000-0000-0000-0000-000000000000",
        ));
    }

    if pool_id.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(
            "pool id",
            "identity pool id contains whitespace",
            "copy the identity pool id exactly as issued by the service",
        ));
    }

    Ok(())
}

fn is_alphanumeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_semantic_version(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 3 && parts.iter().all(|part| is_version_number(part))
}

fn is_version_number(part: &str) -> bool {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    part == "0" || !part.starts_with('0')
}
