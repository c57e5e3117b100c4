//! Store-wide "configured" flag.
//!
//! Secure stores such as the macOS keychain can outlive the application that
//! wrote to them. The flag lives next to the application's other state instead
//! of inside the secure store: when it is missing, whatever the secure store
//! still holds is left over from an earlier install and gets purged once by
//! [`CredentialCache::open`](crate::cache::CredentialCache::open).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Name of the flag shared by every cache of this family.
pub const CONFIGURED_FLAG_NAME: &str =
    "idpool_secure_storage_scopes.identityPoolCredentialStore.isKeychainConfigured";

/// Persisted boolean recording that the secure store has been initialized.
pub trait StoreMarker: Send + Sync {
    /// Whether the store has been initialized before.
    fn is_configured(&self) -> bool;

    /// Record that the store has been initialized.
    fn mark_configured(&self) -> io::Result<()>;
}

/// Flag kept as a file in an application data directory.
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    /// Flag file [`CONFIGURED_FLAG_NAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CONFIGURED_FLAG_NAME),
        }
    }
}

impl StoreMarker for FileMarker {
    fn is_configured(&self) -> bool {
        self.path.is_file()
    }

    fn mark_configured(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, b"true")
    }
}

/// In-process flag for tests and ephemeral stores.
#[derive(Debug, Default)]
pub struct MemoryMarker {
    configured: AtomicBool,
}

impl MemoryMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that is already set, so opening a cache never purges.
    pub fn configured() -> Self {
        Self {
            configured: AtomicBool::new(true),
        }
    }
}

impl StoreMarker for MemoryMarker {
    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    fn mark_configured(&self) -> io::Result<()> {
        self.configured.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_marker_roundtrip() {
        let temp = TempDir::new().unwrap();
        let marker = FileMarker::in_dir(temp.path().join("nested"));

        assert!(!marker.is_configured());
        marker.mark_configured().unwrap();
        assert!(marker.is_configured());

        let reopened = FileMarker::in_dir(temp.path().join("nested"));
        assert!(reopened.is_configured());
    }

    #[test]
    fn test_memory_marker() {
        let marker = MemoryMarker::new();
        assert!(!marker.is_configured());
        marker.mark_configured().unwrap();
        assert!(marker.is_configured());
        assert!(MemoryMarker::configured().is_configured());
    }
}
