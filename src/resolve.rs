//! The bootstrap flow: fetch, then discover, then tell the user what to install.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::catalog::{PackageCatalog, Remediation};
use crate::common::{OsFamily, OsRelease};
use crate::discovery::NativeDiscovery;
use crate::error::{BootstrapError, Result};
use crate::fetch::{Downloader, FetchOutcome, HttpDownloader, NativeFetcher};
use crate::ui::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// A usable runtime library is on disk.
    Ready {
        library: PathBuf,
        fetch: Option<FetchOutcome>,
    },
    /// Nothing found on Linux; install these system packages.
    Remediation(Remediation),
    /// Nothing found and no package guidance exists for this OS.
    Missing,
}

pub struct Resolver<D = HttpDownloader> {
    fetcher: NativeFetcher<D>,
    discovery: NativeDiscovery,
    catalog: Arc<PackageCatalog>,
    os_release: Option<OsRelease>,
}

impl<D: Downloader> Resolver<D> {
    /// Reads os-release when the fetcher targets Linux.
    pub fn new(
        fetcher: NativeFetcher<D>,
        discovery: NativeDiscovery,
        catalog: Arc<PackageCatalog>,
    ) -> Self {
        let os_release = match fetcher.platform().os {
            OsFamily::Linux => OsRelease::detect(),
            _ => None,
        };
        Self {
            fetcher,
            discovery,
            catalog,
            os_release,
        }
    }

    pub fn with_os_release(mut self, os_release: Option<OsRelease>) -> Self {
        self.os_release = os_release;
        self
    }

    /// A failed fetch does not end the run: discovery and remediation still
    /// get their chance, and the fetch error is returned only when neither
    /// produces an answer. Cancellation always ends the run.
    pub async fn resolve(&self, dir: &Path, cancel: &CancellationToken) -> Result<Resolution> {
        let mut fetch_error = None;
        let fetch = match self.fetcher.download_libraries(dir, cancel).await {
            Ok(outcome) => Some(outcome),
            Err(BootstrapError::Cancelled) => return Err(BootstrapError::Cancelled),
            // No prebuilt archive; system packages may still provide the library
            Err(e @ BootstrapError::UnsupportedPlatform { .. }) => {
                emit(
                    Level::Warn,
                    "resolve.fetch.unsupported",
                    &format!("{} {e}; looking for an installed copy", char::from(NerdFont::Warning)),
                    None,
                );
                None
            }
            Err(e) => {
                emit(
                    Level::Warn,
                    "resolve.fetch.failed",
                    &format!("{} {e}; looking for an installed copy", char::from(NerdFont::Warning)),
                    Some(serde_json::json!({ "error": e.to_string() })),
                );
                fetch_error = Some(e);
                None
            }
        };

        let discovered = self.discovery.discover(dir)?;
        if let Some(library) = discovered.into_path() {
            return Ok(Resolution::Ready { library, fetch });
        }

        let platform = self.fetcher.platform();
        if platform.os != OsFamily::Linux {
            return match fetch_error {
                Some(e) => Err(e),
                None => Ok(Resolution::Missing),
            };
        }

        let Some(os_release) = self.os_release.as_ref() else {
            return Err(fetch_error
                .unwrap_or_else(|| BootstrapError::UnknownDistribution("unknown".into())));
        };
        emit(
            Level::Debug,
            "resolve.distribution",
            &format!(
                "{} Looking up packages for {}",
                char::from(NerdFont::Package),
                os_release.display_name()
            ),
            None,
        );
        match self.catalog.remediation(os_release, Some(platform.arch)) {
            Ok(remediation) => Ok(Resolution::Remediation(remediation)),
            Err(e) => Err(fetch_error.unwrap_or(e)),
        }
    }
}
