//! Locating an installed native runtime on disk.

mod known_dirs;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Serialize;

use crate::common::{OsFamily, Platform};
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::ui::prelude::*;

pub use known_dirs::{library_patterns, system_search_dirs};

/// Outcome of a discovery run. A path is present exactly when something was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    found: bool,
    resolved_path: Option<PathBuf>,
}

impl DiscoveryResult {
    pub fn found(path: PathBuf) -> Self {
        Self {
            found: true,
            resolved_path: Some(path),
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            resolved_path: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved_path.as_deref()
    }

    pub fn into_path(self) -> Option<PathBuf> {
        self.resolved_path
    }
}

/// Matches runtime library file names for one OS family.
#[derive(Debug, Clone)]
pub struct LibraryMatcher {
    patterns: Vec<Pattern>,
}

impl LibraryMatcher {
    pub fn for_os(os: OsFamily) -> Self {
        let patterns = library_patterns(os)
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(file_name))
    }

    /// First library file directly inside `dir`.
    ///
    /// Patterns are tried in order, and within a pattern entries are taken in
    /// file name order, so the answer only depends on directory contents.
    /// Missing directories yield `None`; any other read failure is an error.
    pub fn find_in_dir(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(None);
            }
            Err(source) => {
                return Err(BootstrapError::DiscoveryIo {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| BootstrapError::DiscoveryIo {
                path: dir.to_path_buf(),
                source,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        for pattern in &self.patterns {
            for name in names.iter().filter(|name| pattern.matches(name)) {
                let candidate = dir.join(name);
                // Follows symlinks; dangling links are skipped.
                match fs::metadata(&candidate) {
                    Ok(meta) if meta.is_file() => return Ok(Some(candidate)),
                    Ok(_) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(source) => {
                        return Err(BootstrapError::DiscoveryIo {
                            path: candidate,
                            source,
                        });
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Searches a root directory and then well-known locations for the runtime.
#[derive(Debug, Clone)]
pub struct NativeDiscovery {
    matcher: LibraryMatcher,
    search_dirs: Vec<PathBuf>,
}

impl NativeDiscovery {
    /// Discovery with the OS default search directories.
    pub fn new(platform: Platform) -> Self {
        Self {
            matcher: LibraryMatcher::for_os(platform.os),
            search_dirs: system_search_dirs(platform),
        }
    }

    pub fn from_config(platform: Platform, config: &BootstrapConfig) -> Self {
        let mut search_dirs = if config.use_system_paths {
            system_search_dirs(platform)
        } else {
            Vec::new()
        };
        search_dirs.extend(config.extra_search_paths.iter().cloned());
        Self {
            matcher: LibraryMatcher::for_os(platform.os),
            search_dirs,
        }
    }

    /// Replace the directories probed after the root.
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    pub fn matcher(&self) -> &LibraryMatcher {
        &self.matcher
    }

    /// Probe `root`, `root/lib`, then each search directory; first hit wins.
    pub fn discover(&self, root: &Path) -> Result<DiscoveryResult> {
        let root = std::path::absolute(root).map_err(|source| BootstrapError::DiscoveryIo {
            path: root.to_path_buf(),
            source,
        })?;

        let lib_dir = root.join("lib");
        let candidates = [root.as_path(), lib_dir.as_path()]
            .into_iter()
            .chain(self.search_dirs.iter().map(PathBuf::as_path));

        for dir in candidates {
            emit(
                Level::Debug,
                "discovery.probe",
                &format!("{} Probing {}", char::from(NerdFont::Search), dir.display()),
                None,
            );
            if let Some(path) = self.matcher.find_in_dir(dir)? {
                emit(
                    Level::Debug,
                    "discovery.found",
                    &format!("{} Found {}", char::from(NerdFont::Check), path.display()),
                    None,
                );
                return Ok(DiscoveryResult::found(path));
            }
        }

        Ok(DiscoveryResult::not_found())
    }
}
