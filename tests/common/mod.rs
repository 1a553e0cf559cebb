use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory with an isolated config file.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let env = Self {
            temp_dir: tempfile::tempdir()?,
        };
        // Keep host library directories out of discovery
        env.write_config("use_system_paths = false\n")?;
        Ok(env)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn install_dir(&self) -> PathBuf {
        self.path().join("vlc")
    }

    pub fn write_config(&self, content: &str) -> Result<()> {
        fs::write(self.config_path(), content)?;
        Ok(())
    }
}
