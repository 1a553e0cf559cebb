use std::path::PathBuf;

use crate::error::{BootstrapError, Result};

/// Centralized path management for vlcfetch

const APP_DIR: &str = "vlcfetch";

/// Get the vlcfetch config directory
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| BootstrapError::Config("Unable to determine user config directory".into()))
}

/// Get the default config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the default directory the native runtime is installed into
pub fn default_install_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
            home.join(".local/share")
        })
        .join(APP_DIR)
        .join("vlc")
}
