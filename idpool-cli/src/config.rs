//! CLI configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use idpool_core::{IdentityPoolConfig, OwnerScope};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where cached sessions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// OS keyring, persisted across runs.
    Keyring,
    /// Process memory, gone when the command exits.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Region of the identity-exchange service.
    pub region: String,

    /// Identity pool id.
    pub pool_id: String,

    /// Owner key partitioning the cache.
    pub owner_key: String,

    /// Owner version reported to the service.
    pub owner_version: String,

    /// Service endpoint override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Session store backend.
    pub store: StoreBackend,

    /// Logging level.
    pub log_level: String,

    /// Directory for the first-run marker.
    pub data_dir: PathBuf,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".idpool"));

        Self {
            region: String::new(),
            pool_id: String::new(),
            owner_key: "idpoolcli".to_string(),
            owner_version: OwnerScope::DEFAULT_VERSION.to_string(),
            endpoint: None,
            store: StoreBackend::Keyring,
            log_level: "info".to_string(),
            data_dir,
            config_path: PathBuf::new(),
        }
    }
}

impl CliConfig {
    /// The configured identity pool.
    pub fn pool(&self) -> Result<IdentityPoolConfig> {
        IdentityPoolConfig::new(&self.region, &self.pool_id).with_context(|| {
            format!(
                "Identity pool is not configured; set region and pool_id in {:?}",
                self.config_path
            )
        })
    }

    /// The configured cache owner.
    pub fn owner(&self) -> Result<OwnerScope> {
        OwnerScope::new(&self.owner_key, &self.owner_version)
            .with_context(|| format!("Invalid owner in {:?}", self.config_path))
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("idpool.toml"))
}

/// Load configuration from `path`, or the default location.
///
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        CliConfig::default()
    };

    config.config_path = config_path;
    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "raibid-labs", "idpool")
}
