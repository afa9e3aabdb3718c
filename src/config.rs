use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dirs;
use crate::error::{Result, UpdateError};

/// User-configurable settings for the update server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address for the HTTP server (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server (default: 6868)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL clients reach this server under; patch URLs are
    /// prefixed with it.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Owner of the upstream release feed.
    #[serde(default)]
    pub feed_owner: String,

    /// Repository name of the upstream release feed.
    #[serde(default)]
    pub feed_repo: String,

    /// Directory for cached release assets.
    #[serde(default = "dirs::assets_dir")]
    pub asset_dir: PathBuf,

    /// Directory for generated patch files.
    #[serde(default = "dirs::patches_dir")]
    pub patch_dir: PathBuf,

    /// PEM-encoded PKCS#1 RSA private key used to sign asset checksums.
    #[serde(default = "dirs::default_key_path")]
    pub private_key: PathBuf,

    /// Seconds between release feed polls (default: 600).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6868
}

fn default_public_url() -> String {
    format!("http://{}:{}", default_host(), default_port())
}

fn default_poll_interval() -> u64 {
    600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            feed_owner: String::new(),
            feed_repo: String::new(),
            asset_dir: dirs::assets_dir(),
            patch_dir: dirs::patches_dir(),
            private_key: dirs::default_key_path(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the default config file path.
    /// Returns default config if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&dirs::config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                UpdateError::Config(format!("failed to read config file {}: {e}", path.display()))
            })?;
            let config: ServerConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current configuration to the default config file path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&dirs::config_path())
    }

    /// Save the current configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The feed coordinates are the one thing with no sensible default.
    pub fn validate(&self) -> Result<()> {
        if self.feed_owner.is_empty() || self.feed_repo.is_empty() {
            return Err(UpdateError::Config(
                "feed_owner and feed_repo must be set (config file or --owner/--repo)".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the server bind address string (e.g., "127.0.0.1:6868").
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
