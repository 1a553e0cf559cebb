use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::paths;
use crate::error::{BootstrapError, Result};
use crate::fetch::DEFAULT_MIRROR;

/// Bounded retry of transient download failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryConfig {
    /// Attempts allowed for one download.
    pub fn attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

/// Settings read from `config.toml`. Every field has a default, so an
/// absent or partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Where the runtime is installed when no directory is given.
    pub install_dir: Option<PathBuf>,
    /// Base URL for archives with relative paths in the archive table.
    pub mirror_base_url: String,
    /// Upper bound for one download, in seconds. 0 disables the limit.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Directory holding a replacement `linux-package-installation.json`.
    pub catalog_dir: Option<PathBuf>,
    /// Searched after the OS default locations.
    pub extra_search_paths: Vec<PathBuf>,
    pub use_system_paths: bool,
    pub retry: RetryConfig,
    /// sha256 overrides keyed by platform (`linux-x86_64`).
    pub checksums: BTreeMap<String, String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            install_dir: None,
            mirror_base_url: DEFAULT_MIRROR.to_string(),
            timeout_secs: 300,
            user_agent: format!("vlcfetch/{}", env!("CARGO_PKG_VERSION")),
            catalog_dir: None,
            extra_search_paths: Vec::new(),
            use_system_paths: true,
            retry: RetryConfig::default(),
            checksums: BTreeMap::new(),
        }
    }
}

impl BootstrapConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_path(paths::config_path()?)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BootstrapError::Config(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| BootstrapError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| BootstrapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mirror_base_url.trim().is_empty() {
            return Err(BootstrapError::Config(
                "mirror_base_url must not be empty".into(),
            ));
        }
        if self.retry.enabled && self.retry.max_attempts == 0 {
            return Err(BootstrapError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        for (platform, checksum) in &self.checksums {
            if checksum.len() != 64 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(BootstrapError::Config(format!(
                    "checksum for {platform} is not a sha256 hex digest"
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn install_dir(&self) -> PathBuf {
        self.install_dir
            .clone()
            .unwrap_or_else(paths::default_install_dir)
    }
}
