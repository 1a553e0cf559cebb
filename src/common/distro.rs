use std::fs;
use std::iter;

/// Locations of the os-release file, in lookup order.
const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Identity of the running Linux distribution, as reported by os-release.
///
/// Only the fields needed to pick catalog entries are kept. `id` and every
/// `id_like` token are lowercased so they can be compared against catalog keys
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub version_id: Option<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Read the distribution identity of this host.
    ///
    /// Returns `None` when no os-release file is readable (non-Linux hosts,
    /// minimal containers).
    pub fn detect() -> Option<Self> {
        OS_RELEASE_PATHS
            .iter()
            .find_map(|path| fs::read_to_string(path).ok())
            .map(|content| Self::parse(&content))
    }

    /// Parse os-release content.
    pub fn parse(content: &str) -> Self {
        let mut release = Self::default();

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');

            match key {
                "ID" => release.id = value.to_ascii_lowercase(),
                "ID_LIKE" => {
                    release.id_like = value
                        .split_whitespace()
                        .map(str::to_ascii_lowercase)
                        .collect()
                }
                "VERSION_ID" if !value.is_empty() => release.version_id = Some(value.to_string()),
                "PRETTY_NAME" if !value.is_empty() => {
                    release.pretty_name = Some(value.to_string())
                }
                _ => {}
            }
        }

        release
    }

    /// Catalog keys to try for this distribution: `ID` first, then each
    /// `ID_LIKE` parent in the order the distribution lists them.
    pub fn candidate_keys(&self) -> impl Iterator<Item = &str> {
        iter::once(self.id.as_str())
            .chain(self.id_like.iter().map(String::as_str))
            .filter(|key| !key.is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.pretty_name.as_deref().unwrap_or(&self.id)
    }
}
