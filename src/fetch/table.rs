//! Versioned table of prebuilt runtime archives per platform.

use std::collections::BTreeMap;
use std::path::Path;

use crate::common::{CpuArch, OsFamily, Platform};
use crate::error::{BootstrapError, Result};

/// Runtime release the built-in table points at.
pub const VLC_VERSION: &str = "3.0.21";

/// Default base URL for archives with relative paths.
pub const DEFAULT_MIRROR: &str = "https://github.com/MinecraftMediaLibrary/VLC-Release-Mirror/raw/master";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarZst,
    Zip,
}

impl ArchiveFormat {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.zst") {
            Some(Self::TarZst)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// One row of the table. `location` and each mirror are either an absolute
/// URL or a path relative to the table's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformArchive {
    pub platform: Platform,
    pub location: String,
    /// Tried in order when `location` cannot be downloaded.
    pub mirrors: Vec<String>,
    pub sha256: Option<String>,
}

impl PlatformArchive {
    pub fn new(platform: Platform, location: impl Into<String>) -> Self {
        Self {
            platform,
            location: location.into(),
            mirrors: Vec::new(),
            sha256: None,
        }
    }

    pub fn with_mirror(mut self, location: impl Into<String>) -> Self {
        self.mirrors.push(location.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

/// An archive ready to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArchive {
    /// Primary URL. Install stamps record this one, whichever URL served the
    /// bytes.
    pub url: String,
    pub mirrors: Vec<String>,
    pub file_name: String,
    pub format: ArchiveFormat,
    pub sha256: Option<String>,
    pub version: String,
}

impl ResolvedArchive {
    /// Primary URL followed by the mirrors.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.mirrors.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveTable {
    version: String,
    base_url: String,
    entries: Vec<PlatformArchive>,
    checksum_overrides: BTreeMap<String, String>,
}

impl ArchiveTable {
    pub fn new(
        version: impl Into<String>,
        base_url: impl Into<String>,
        entries: Vec<PlatformArchive>,
    ) -> Self {
        Self {
            version: version.into(),
            base_url: base_url.into(),
            entries,
            checksum_overrides: BTreeMap::new(),
        }
    }

    /// The archives published for [`VLC_VERSION`].
    pub fn builtin() -> Self {
        use CpuArch::*;
        use OsFamily::*;

        let v = VLC_VERSION;
        let entries = vec![
            PlatformArchive::new(
                Platform::new(Windows, X86_64),
                format!("https://get.videolan.org/vlc/{v}/win64/vlc-{v}-win64.zip"),
            )
            .with_mirror(format!("win/vlc-{v}-win64.zip")),
            PlatformArchive::new(
                Platform::new(Windows, X86),
                format!("https://get.videolan.org/vlc/{v}/win32/vlc-{v}-win32.zip"),
            )
            .with_mirror(format!("win/vlc-{v}-win32.zip")),
            PlatformArchive::new(
                Platform::new(Linux, X86_64),
                format!("linux/libvlc-{v}-linux-x86_64.tar.gz"),
            ),
            PlatformArchive::new(
                Platform::new(Linux, Aarch64),
                format!("linux/libvlc-{v}-linux-aarch64.tar.gz"),
            ),
            PlatformArchive::new(
                Platform::new(MacOs, X86_64),
                format!("mac/libvlc-{v}-macos-x86_64.tar.gz"),
            ),
            PlatformArchive::new(
                Platform::new(MacOs, Aarch64),
                format!("mac/libvlc-{v}-macos-arm64.tar.gz"),
            ),
        ];
        Self::new(v, DEFAULT_MIRROR, entries)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-platform sha256 values that replace the table's own.
    pub fn with_checksums(mut self, checksums: BTreeMap<String, String>) -> Self {
        self.checksum_overrides = checksums;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Archive for `platform`, or `UnsupportedPlatform`.
    pub fn resolve(&self, platform: Platform) -> Result<ResolvedArchive> {
        let unsupported = || BootstrapError::UnsupportedPlatform {
            os: platform.os.to_string(),
            arch: platform.arch.to_string(),
        };

        let entry = self
            .entries
            .iter()
            .find(|e| e.platform == platform)
            .ok_or_else(unsupported)?;

        let url = self.absolute(&entry.location);
        let mirrors = entry.mirrors.iter().map(|m| self.absolute(m)).collect();

        let file_name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("archive")
            .to_string();
        let format = ArchiveFormat::from_file_name(&file_name).ok_or_else(|| {
            BootstrapError::extraction(Path::new(&file_name), "unsupported archive format")
        })?;

        let sha256 = self
            .checksum_overrides
            .get(&platform.key())
            .or(entry.sha256.as_ref())
            .map(|s| s.to_ascii_lowercase());

        Ok(ResolvedArchive {
            url,
            mirrors,
            file_name,
            format,
            sha256,
            version: self.version.clone(),
        })
    }

    fn absolute(&self, location: &str) -> String {
        if location.contains("://") {
            location.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                location.trim_start_matches('/')
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_release_platforms() {
        let table = ArchiveTable::builtin();
        for (os, arch) in [
            (OsFamily::Windows, CpuArch::X86_64),
            (OsFamily::Linux, CpuArch::X86_64),
            (OsFamily::Linux, CpuArch::Aarch64),
            (OsFamily::MacOs, CpuArch::X86_64),
            (OsFamily::MacOs, CpuArch::Aarch64),
        ] {
            assert!(table.resolve(Platform::new(os, arch)).is_ok(), "{os}/{arch}");
        }
    }

    #[test]
    fn test_unsupported_platform() {
        let err = ArchiveTable::builtin()
            .resolve(Platform::new(OsFamily::MacOs, CpuArch::X86))
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::UnsupportedPlatform { ref os, ref arch } if os == "macos" && arch == "x86"
        ));
    }

    #[test]
    fn test_relative_location_uses_base_url() {
        let table = ArchiveTable::builtin().with_base_url("https://mirror.example.org/vlc/");
        let archive = table
            .resolve(Platform::new(OsFamily::Linux, CpuArch::X86_64))
            .unwrap();
        assert_eq!(
            archive.url,
            format!("https://mirror.example.org/vlc/linux/libvlc-{VLC_VERSION}-linux-x86_64.tar.gz")
        );
        assert_eq!(archive.format, ArchiveFormat::TarGz);
        assert_eq!(archive.version, VLC_VERSION);
    }

    #[test]
    fn test_absolute_location_ignores_base_url() {
        let table = ArchiveTable::builtin().with_base_url("https://mirror.example.org");
        let archive = table
            .resolve(Platform::new(OsFamily::Windows, CpuArch::X86_64))
            .unwrap();
        assert!(archive.url.starts_with("https://get.videolan.org/"));
        assert_eq!(archive.file_name, format!("vlc-{VLC_VERSION}-win64.zip"));
        assert_eq!(archive.format, ArchiveFormat::Zip);
    }

    #[test]
    fn test_mirrors_follow_primary() {
        let platform = Platform::new(OsFamily::Windows, CpuArch::X86_64);
        let table = ArchiveTable::builtin().with_base_url("https://mirror.example.org/");
        let archive = table.resolve(platform).unwrap();
        let urls: Vec<String> = archive.urls().map(str::to_string).collect();
        assert_eq!(
            urls,
            vec![
                archive.url.clone(),
                format!("https://mirror.example.org/win/vlc-{VLC_VERSION}-win64.zip"),
            ]
        );

        let table = ArchiveTable::new(
            "1.0",
            "https://example.org",
            vec![
                PlatformArchive::new(platform, "https://a.invalid/vlc.zip")
                    .with_mirror("https://b.invalid/vlc.zip")
                    .with_mirror("c/vlc.zip"),
            ],
        );
        let archive = table.resolve(platform).unwrap();
        assert_eq!(
            archive.urls().collect::<Vec<_>>(),
            ["https://a.invalid/vlc.zip", "https://b.invalid/vlc.zip", "https://example.org/c/vlc.zip"]
        );
    }

    #[test]
    fn test_checksum_override() {
        let platform = Platform::new(OsFamily::Linux, CpuArch::X86_64);
        let table = ArchiveTable::new(
            "1.0",
            "https://example.org",
            vec![PlatformArchive::new(platform, "a.tgz").with_sha256("AA")],
        );
        assert_eq!(table.resolve(platform).unwrap().sha256.as_deref(), Some("aa"));

        let table = table.with_checksums(BTreeMap::from([(platform.key(), "BB".to_string())]));
        assert_eq!(table.resolve(platform).unwrap().sha256.as_deref(), Some("bb"));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let platform = Platform::new(OsFamily::MacOs, CpuArch::Aarch64);
        let table = ArchiveTable::new("1.0", "https://example.org", vec![PlatformArchive::new(platform, "VLC.dmg")]);
        assert!(matches!(
            table.resolve(platform),
            Err(BootstrapError::Extraction { .. })
        ));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ArchiveFormat::from_file_name("a.TGZ"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_file_name("a.tar.xz"), Some(ArchiveFormat::TarXz));
        assert_eq!(ArchiveFormat::from_file_name("a.tar.zst"), Some(ArchiveFormat::TarZst));
        assert_eq!(ArchiveFormat::from_file_name("a.7z"), None);
    }
}
