//! Downloading and installing the prebuilt native runtime.

mod download;
mod extract;
mod lock;
mod table;

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::common::Platform;
use crate::common::progress::{create_spinner, finish_spinner_with_success};
use crate::config::{BootstrapConfig, RetryConfig};
use crate::discovery::LibraryMatcher;
use crate::error::{BootstrapError, Result};
use crate::ui::prelude::*;

pub use download::{Downloader, HttpDownloader, classify_status, download_with_retry};
pub use extract::{extract_archive, find_library_dir, install_tree};
pub use lock::{DirectoryGuard, DirectoryLocks, InstallLock, LOCK_FILE, lock_directory};
pub use table::{
    ArchiveFormat, ArchiveTable, DEFAULT_MIRROR, PlatformArchive, ResolvedArchive, VLC_VERSION,
};

/// Written into the destination after a complete install.
pub const STAMP_FILE: &str = ".vlcfetch.json";
const STAGING_PREFIX: &str = ".vlcfetch-staging";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Record of a finished install, used to skip re-downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStamp {
    pub version: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Library file name, relative to the destination.
    pub library: String,
}

impl InstallStamp {
    fn read(dest: &Path) -> Option<Self> {
        let content = fs::read_to_string(dest.join(STAMP_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Write via a temporary file and rename so readers never see a partial stamp.
    fn write(&self, dest: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        let tmp = dest.join(format!("{STAMP_FILE}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, dest.join(STAMP_FILE))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Installed { library: PathBuf },
    AlreadyInstalled { library: PathBuf },
}

impl FetchOutcome {
    pub fn library(&self) -> &Path {
        match self {
            Self::Installed { library } | Self::AlreadyInstalled { library } => library,
        }
    }
}

pub struct NativeFetcher<D = HttpDownloader> {
    downloader: D,
    table: ArchiveTable,
    platform: Platform,
    matcher: LibraryMatcher,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl NativeFetcher<HttpDownloader> {
    /// Fetcher for `platform` using the built-in archive table with the
    /// configured mirror, checksums, retry and timeout.
    pub fn from_config(config: &BootstrapConfig, platform: Platform) -> Result<Self> {
        let downloader = HttpDownloader::new(&config.user_agent, Some(CONNECT_TIMEOUT))?;
        let table = ArchiveTable::builtin()
            .with_base_url(config.mirror_base_url.clone())
            .with_checksums(config.checksums.clone());
        Ok(Self::new(downloader, table, platform)
            .with_retry(config.retry.clone())
            .with_timeout(config.timeout()))
    }
}

impl<D: Downloader> NativeFetcher<D> {
    pub fn new(downloader: D, table: ArchiveTable, platform: Platform) -> Self {
        Self {
            downloader,
            table,
            platform,
            matcher: LibraryMatcher::for_os(platform.os),
            retry: RetryConfig::default(),
            timeout: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound for the download step. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Make sure the runtime for this platform is installed in `dest`.
    ///
    /// An existing install of the same archive is verified and kept. On any
    /// failure, including cancellation, partial files are removed and no
    /// stamp is written.
    pub async fn download_libraries(
        &self,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        // Must fail before touching the network or the filesystem
        let archive = self.table.resolve(self.platform)?;
        emit(
            Level::Debug,
            "fetch.archive.selected",
            &format!(
                "{} {} for {}",
                char::from(NerdFont::Archive),
                archive.url,
                self.platform
            ),
            None,
        );

        if cancel.is_cancelled() {
            return Err(BootstrapError::Cancelled);
        }

        tokio::fs::create_dir_all(dest).await?;
        let dest = tokio::fs::canonicalize(dest).await?;

        emit(
            Level::Debug,
            "fetch.lock",
            &format!("{} Locking {}", char::from(NerdFont::Lock), dest.display()),
            None,
        );
        // Stale staging may only be removed while this is held
        let _guard = lock_directory(&dest, cancel).await?;

        if let Some(library) = self.installed_library(&dest, &archive) {
            emit(
                Level::Info,
                "fetch.skip",
                &format!(
                    "{} VLC {} already installed in {}",
                    char::from(NerdFont::Check),
                    archive.version,
                    dest.display()
                ),
                Some(serde_json::json!({ "library": library })),
            );
            return Ok(FetchOutcome::AlreadyInstalled { library });
        }

        remove_stale_staging(&dest);
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&dest)?;

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(BootstrapError::Cancelled),
            result = self.install(&archive, &dest, staging.path(), cancel) => result,
        };

        if let Err(e) = staging.close() {
            emit(
                Level::Debug,
                "fetch.staging.cleanup_failed",
                &format!("{} Failed to remove staging directory: {e}", char::from(NerdFont::Warning)),
                None,
            );
        }

        let library = result?;
        emit(
            Level::Success,
            "fetch.installed",
            &format!(
                "{} Installed VLC {} to {}",
                char::from(NerdFont::Check),
                archive.version,
                dest.display()
            ),
            Some(serde_json::json!({ "library": library, "url": archive.url })),
        );
        Ok(FetchOutcome::Installed { library })
    }

    fn installed_library(&self, dest: &Path, archive: &ResolvedArchive) -> Option<PathBuf> {
        let stamp = InstallStamp::read(dest)?;
        if stamp.url != archive.url || stamp.sha256 != archive.sha256 {
            return None;
        }
        let library = dest.join(&stamp.library);
        library.is_file().then_some(library)
    }

    async fn install(
        &self,
        archive: &ResolvedArchive,
        dest: &Path,
        staging: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let archive_path = staging.join(&archive.file_name);

        let urls: Vec<&str> = archive.urls().collect();
        for (i, url) in urls.iter().enumerate() {
            match self.download_from(url, &archive_path, cancel).await {
                Ok(()) => break,
                Err(e @ BootstrapError::Download { .. }) if i + 1 < urls.len() => {
                    emit(
                        Level::Warn,
                        "fetch.download.mirror",
                        &format!(
                            "{} {e}; trying mirror {}",
                            char::from(NerdFont::Warning),
                            urls[i + 1]
                        ),
                        Some(serde_json::json!({ "failed": url, "next": urls[i + 1] })),
                    );
                    let _ = fs::remove_file(&archive_path);
                }
                Err(e) => return Err(e),
            }
        }

        verify_archive(&archive_path, archive.sha256.as_deref())?;

        let extracted = staging.join("extracted");
        fs::create_dir(&extracted)?;
        let pb = create_spinner(format!("Extracting {}", archive.file_name));
        let extraction = extract_archive(&archive_path, archive.format, &extracted).await;
        pb.finish_and_clear();
        extraction?;

        let library_dir = find_library_dir(&extracted, &self.matcher).ok_or_else(|| {
            BootstrapError::extraction(&archive_path, "archive does not contain the VLC library")
        })?;

        // Named from the archive so a stale library already in `dest` is never reported
        let library_name = self
            .matcher
            .find_in_dir(&library_dir)?
            .and_then(|staged| staged.file_name().map(|n| n.to_string_lossy().into_owned()))
            .ok_or_else(|| {
                BootstrapError::extraction(&archive_path, "archive does not contain the VLC library")
            })?;

        let pb = create_spinner(format!("Installing into {}", dest.display()));
        install_tree(&library_dir, dest)?;
        let library = dest.join(&library_name);
        if !library.is_file() {
            pb.finish_and_clear();
            return Err(BootstrapError::extraction(
                &archive_path,
                "library missing after install",
            ));
        }
        finish_spinner_with_success(pb, format!("Installed {}", library.display()));

        InstallStamp {
            version: archive.version.clone(),
            url: archive.url.clone(),
            sha256: archive.sha256.clone(),
            library: library_name,
        }
        .write(dest)?;

        Ok(library)
    }

    /// One URL, with retries and the download timeout applied.
    async fn download_from(
        &self,
        url: &str,
        archive_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        emit(
            Level::Info,
            "fetch.download.start",
            &format!("{} Downloading {url}", char::from(NerdFont::Download)),
            None,
        );
        let download = download_with_retry(&self.downloader, url, archive_path, &self.retry, cancel);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, download).await.map_err(|_| {
                BootstrapError::transient(url, format!("timed out after {}s", limit.as_secs()))
            })??,
            None => download.await?,
        };
        Ok(())
    }
}

/// Non-empty check plus sha256 comparison when a checksum is known.
fn verify_archive(archive: &Path, expected: Option<&str>) -> Result<()> {
    let size = fs::metadata(archive)?.len();
    if size == 0 {
        return Err(BootstrapError::extraction(archive, "downloaded archive is empty"));
    }

    let Some(expected) = expected else {
        emit(
            Level::Warn,
            "fetch.checksum.skip",
            &format!(
                "{} No checksum available; skipping verification",
                char::from(NerdFont::Warning)
            ),
            None,
        );
        return Ok(());
    };

    let mut hasher = Sha256::new();
    io::copy(&mut fs::File::open(archive)?, &mut hasher)?;
    let actual = format!("{:x}", hasher.finalize());

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(BootstrapError::extraction(
            archive,
            format!("checksum mismatch: expected {expected}, got {actual}"),
        ));
    }

    emit(
        Level::Success,
        "fetch.checksum.verified",
        &format!("{} Checksum verified", char::from(NerdFont::Check)),
        None,
    );
    Ok(())
}

/// Remove staging directories an interrupted run left behind.
fn remove_stale_staging(dest: &Path) {
    let Ok(entries) = fs::read_dir(dest) else {
        return;
    };
    for entry in entries.flatten() {
        let is_staging = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(STAGING_PREFIX));
        if is_staging && entry.path().is_dir() {
            emit(
                Level::Debug,
                "fetch.staging.stale",
                &format!(
                    "{} Removing stale {}",
                    char::from(NerdFont::Folder),
                    entry.path().display()
                ),
                None,
            );
            let _ = fs::remove_dir_all(entry.path());
        }
    }
}
