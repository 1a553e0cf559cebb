use anyhow::{Result, bail};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use vlcfetch::fetch::Downloader;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Events printed in `--json` mode, from both streams.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn has_event(&self, code: &str) -> bool {
        self.events().iter().any(|e| e["code"] == code)
    }
}

/// Run the built binary against the environment's config file.
pub fn run_vlcfetch_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_vlcfetch"))
        .arg("--config")
        .arg(env.config_path())
        .arg("--json")
        .args(args)
        .current_dir(env.path())
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Build a tar.gz shaped like the upstream runtime bundle.
pub fn create_runtime_archive(env: &TestEnvironment) -> Result<PathBuf> {
    let tree = env.path().join("bundle");
    let lib = tree.join("vlc-3.0.21/lib");
    fs::create_dir_all(lib.join("vlc/plugins/codec"))?;
    fs::write(lib.join("libvlc.so.5.6.1"), b"\x7fELF libvlc")?;
    fs::write(lib.join("libvlccore.so.9.0.1"), b"\x7fELF libvlccore")?;
    fs::write(lib.join("vlc/plugins/codec/libavcodec_plugin.so"), b"\x7fELF")?;

    let archive = env.path().join("libvlc-3.0.21-linux-x86_64.tar.gz");
    let status = Command::new("tar")
        .arg("-czf")
        .arg(&archive)
        .arg("-C")
        .arg(&tree)
        .arg("vlc-3.0.21")
        .status()?;
    if !status.success() {
        bail!("tar failed with {status}");
    }
    Ok(archive)
}

/// Serves a local archive in place of the network.
pub struct LocalDownloader {
    source: PathBuf,
}

impl LocalDownloader {
    pub fn new(source: PathBuf) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Downloader for LocalDownloader {
    async fn download(&self, _url: &str, dest: &Path) -> vlcfetch::Result<u64> {
        Ok(tokio::fs::copy(&self.source, dest).await?)
    }
}
