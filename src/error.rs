use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;

/// Whether retrying a failed download can reasonably succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadErrorKind {
    /// Timeouts, dropped connections, 408/429/5xx responses.
    Transient,
    /// Everything a retry will not fix (404, bad URL, local write failure).
    Permanent,
}

impl fmt::Display for DownloadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Malformed package catalog: {0}")]
    MalformedCatalog(String),

    #[error("Resource not found: {name}")]
    ResourceNotFound { name: String },

    #[error("Failed to search {}: {source}", path.display())]
    DiscoveryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Download of {url} failed ({kind}): {reason}")]
    Download {
        url: String,
        kind: DownloadErrorKind,
        reason: String,
    },

    #[error("Failed to extract {}: {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },

    #[error("Unknown Linux distribution: {0}")]
    UnknownDistribution(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    pub fn transient(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            kind: DownloadErrorKind::Transient,
            reason: reason.into(),
        }
    }

    pub fn permanent(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            kind: DownloadErrorKind::Permanent,
            reason: reason.into(),
        }
    }

    pub fn extraction(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            reason: reason.into(),
        }
    }

    /// True only for transient download failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Download {
                kind: DownloadErrorKind::Transient,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_downloads_are_retryable() {
        assert!(BootstrapError::transient("https://x", "timed out").is_retryable());
        assert!(!BootstrapError::permanent("https://x", "HTTP 404").is_retryable());
        assert!(!BootstrapError::extraction("/tmp/a.zip", "corrupt").is_retryable());
        assert!(
            !BootstrapError::UnsupportedPlatform {
                os: "linux".into(),
                arch: "arm".into()
            }
            .is_retryable()
        );
        assert!(!BootstrapError::Cancelled.is_retryable());
    }

    #[test]
    fn test_download_message_names_kind() {
        let err = BootstrapError::transient("https://example.com/a.tgz", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "Download of https://example.com/a.tgz failed (transient): HTTP 503"
        );
    }
}
