//! JSON wire format of the package catalog.
//!
//! ```json
//! {
//!   "ubuntu": {
//!     "18.04":  [ {"manager": "apt", "package": "libvlc-dev"} ],
//!     "LATEST": [ {"manager": "apt", "package": "libvlc-dev", "arch": "x86_64"} ]
//!   },
//!   "arch": [ {"manager": "pacman", "package": "vlc"} ]
//! }
//! ```
//!
//! A distribution maps either to an object of release lists or to a flat
//! list, which is shorthand for `{"LATEST": [...]}`. Encoding writes a
//! `LATEST`-only distribution back as the flat list. Package entries are
//! always `{"manager", "package", "arch"?}` objects; unknown fields are
//! rejected.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{LinuxOSPackages, LinuxPackage, PackageCatalog, PackageManager};
use crate::common::CpuArch;
use crate::error::{BootstrapError, Result};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageEntry {
    manager: PackageManager,
    package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ReleaseTable {
    Flat(Vec<PackageEntry>),
    ByRelease(IndexMap<String, Vec<PackageEntry>>),
}

type CatalogDocument = IndexMap<String, ReleaseTable>;

/// Decode a catalog document. Either the whole document is valid or nothing
/// is returned.
pub fn decode(json: &str) -> Result<PackageCatalog> {
    let document: CatalogDocument =
        serde_json::from_str(json).map_err(|e| BootstrapError::MalformedCatalog(e.to_string()))?;

    let mut distributions = IndexMap::with_capacity(document.len());
    for (distro, table) in document {
        let packages = match table {
            ReleaseTable::Flat(entries) => LinuxOSPackages::latest(convert_entries(&entries)?),
            ReleaseTable::ByRelease(releases) => {
                let mut converted = IndexMap::with_capacity(releases.len());
                for (release, entries) in releases {
                    converted.insert(release, convert_entries(&entries)?);
                }
                LinuxOSPackages::new(converted)
            }
        }
        .map_err(|e| match e {
            BootstrapError::MalformedCatalog(reason) => {
                BootstrapError::MalformedCatalog(format!("{distro}: {reason}"))
            }
            other => other,
        })?;
        distributions.insert(distro, packages);
    }

    PackageCatalog::new(distributions)
}

/// Encode a catalog as pretty-printed JSON.
pub fn encode(catalog: &PackageCatalog) -> Result<String> {
    let document: CatalogDocument = catalog
        .distributions()
        .map(|(distro, packages)| {
            let table = if packages.is_latest_only() {
                let (_, entries) = packages.select(None);
                ReleaseTable::Flat(entries.iter().map(to_entry).collect())
            } else {
                ReleaseTable::ByRelease(
                    packages
                        .releases()
                        .map(|(release, entries)| {
                            (release.to_string(), entries.iter().map(to_entry).collect())
                        })
                        .collect(),
                )
            };
            (distro.to_string(), table)
        })
        .collect();

    serde_json::to_string_pretty(&document)
        .map_err(|e| BootstrapError::MalformedCatalog(e.to_string()))
}

fn convert_entries(entries: &[PackageEntry]) -> Result<Vec<LinuxPackage>> {
    entries
        .iter()
        .map(|entry| {
            let arch = entry
                .arch
                .as_deref()
                .map(|name| {
                    CpuArch::from_name(name).ok_or_else(|| {
                        BootstrapError::MalformedCatalog(format!(
                            "unknown architecture '{name}' for package '{}'",
                            entry.package
                        ))
                    })
                })
                .transpose()?;
            Ok(LinuxPackage {
                manager: entry.manager,
                package: entry.package.clone(),
                arch,
            })
        })
        .collect()
}

fn to_entry(package: &LinuxPackage) -> PackageEntry {
    PackageEntry {
        manager: package.manager,
        package: package.package.clone(),
        arch: package.arch.map(|arch| arch.as_str().to_string()),
    }
}
