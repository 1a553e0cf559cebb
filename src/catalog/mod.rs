//! Linux package catalog: which system packages provide the native runtime
//! on each distribution.
//!
//! The catalog is a two level index, distribution key then release key, loaded
//! once from the bundled `linux-package-installation.json` and never mutated
//! afterwards. Share it behind an `Arc`.
//!
//! # Release selection
//!
//! Every distribution has one or more releases. The reserved release `LATEST`
//! is the fallback when the host's `VERSION_ID` matches no other release key.
//!
//! ```ignore
//! let catalog = PackageCatalog::load(&BundledResources)?;
//! let packages = catalog.lookup("ubuntu", Some("22.04"), Some(CpuArch::X86_64))?;
//! ```

pub mod codec;
mod manager;
pub mod resource;

use indexmap::IndexMap;
use serde::Serialize;

use crate::common::{CpuArch, OsRelease};
use crate::error::{BootstrapError, Result};

pub use codec::{decode, encode};
pub use manager::PackageManager;
pub use resource::{BundledResources, DirectoryResources, ResourceLoader};

/// Logical name of the bundled catalog resource.
pub const CATALOG_RESOURCE: &str = "linux-package-installation.json";

/// Release key used when no release matches the host version.
pub const LATEST: &str = "LATEST";

/// A single installable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LinuxPackage {
    pub manager: PackageManager,
    pub package: String,
    /// Restricts the entry to one architecture when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<CpuArch>,
}

impl LinuxPackage {
    pub fn new(manager: PackageManager, package: impl Into<String>) -> Self {
        Self {
            manager,
            package: package.into(),
            arch: None,
        }
    }

    pub fn with_arch(mut self, arch: CpuArch) -> Self {
        self.arch = Some(arch);
        self
    }

    /// Entries without an architecture apply everywhere.
    pub fn applies_to(&self, arch: Option<CpuArch>) -> bool {
        self.arch.is_none_or(|wanted| arch == Some(wanted))
    }

    pub fn install_hint(&self) -> String {
        self.manager.install_hint([self.package.as_str()])
    }
}

/// Package lists of one distribution, keyed by release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxOSPackages {
    releases: IndexMap<String, Vec<LinuxPackage>>,
}

impl LinuxOSPackages {
    /// Build from release lists. Fails when there are no releases, a release
    /// has no packages or a package identifier is empty.
    pub fn new(releases: IndexMap<String, Vec<LinuxPackage>>) -> Result<Self> {
        if releases.is_empty() {
            return Err(BootstrapError::MalformedCatalog(
                "distribution has no releases".into(),
            ));
        }
        for (release, packages) in &releases {
            if release.trim().is_empty() {
                return Err(BootstrapError::MalformedCatalog(
                    "release key must not be empty".into(),
                ));
            }
            if packages.is_empty() {
                return Err(BootstrapError::MalformedCatalog(format!(
                    "release '{release}' lists no packages"
                )));
            }
            if packages.iter().any(|p| p.package.trim().is_empty()) {
                return Err(BootstrapError::MalformedCatalog(format!(
                    "release '{release}' has an empty package identifier"
                )));
            }
        }
        Ok(Self { releases })
    }

    /// A single package list that applies to every release.
    pub fn latest(packages: Vec<LinuxPackage>) -> Result<Self> {
        Self::new(IndexMap::from([(LATEST.to_string(), packages)]))
    }

    /// True when the only release is `LATEST`; such entries encode as a flat list.
    pub fn is_latest_only(&self) -> bool {
        self.releases.len() == 1 && self.releases.contains_key(LATEST)
    }

    pub fn releases(&self) -> impl Iterator<Item = (&str, &[LinuxPackage])> {
        self.releases
            .iter()
            .map(|(release, packages)| (release.as_str(), packages.as_slice()))
    }

    pub fn get(&self, release: &str) -> Option<&[LinuxPackage]> {
        self.releases.get(release).map(Vec::as_slice)
    }

    /// Pick the release for a host version.
    ///
    /// An exact key match wins, then a key the version starts with on a
    /// component boundary (`"22.04.3"` matches `"22.04"` but `"18.04"` does not
    /// match `"8"`), then `LATEST`, then the first release.
    pub fn select(&self, version: Option<&str>) -> (&str, &[LinuxPackage]) {
        if let Some(version) = version.map(str::to_ascii_lowercase) {
            let candidates = self.releases().filter(|(release, _)| *release != LATEST);

            let mut prefix_match = None;
            for (release, packages) in candidates {
                let key = release.to_ascii_lowercase();
                if key == version {
                    return (release, packages);
                }
                if prefix_match.is_none()
                    && version
                        .strip_prefix(&key)
                        .is_some_and(|rest| rest.starts_with(['.', '-', '_', ' ']))
                {
                    prefix_match = Some((release, packages));
                }
            }
            if let Some(found) = prefix_match {
                return found;
            }
        }

        if let Some((release, packages)) = self.releases.get_key_value(LATEST) {
            return (release.as_str(), packages.as_slice());
        }

        // `new` rejects empty maps, so there is always a first release.
        self.releases()
            .next()
            .unwrap_or((LATEST, &[]))
    }
}

/// Root document: distribution key to release lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCatalog {
    distributions: IndexMap<String, LinuxOSPackages>,
}

impl PackageCatalog {
    pub fn new(distributions: IndexMap<String, LinuxOSPackages>) -> Result<Self> {
        if distributions.is_empty() {
            return Err(BootstrapError::MalformedCatalog(
                "catalog lists no distributions".into(),
            ));
        }
        if distributions.keys().any(|key| key.trim().is_empty()) {
            return Err(BootstrapError::MalformedCatalog(
                "distribution key must not be empty".into(),
            ));
        }
        Ok(Self { distributions })
    }

    /// Load and decode the catalog resource.
    pub fn load(loader: &dyn ResourceLoader) -> Result<Self> {
        let bytes = loader.load(CATALOG_RESOURCE)?;
        let text = std::str::from_utf8(&bytes).map_err(|e| {
            BootstrapError::MalformedCatalog(format!("{CATALOG_RESOURCE} is not UTF-8: {e}"))
        })?;
        decode(text)
    }

    pub fn distributions(&self) -> impl Iterator<Item = (&str, &LinuxOSPackages)> {
        self.distributions
            .iter()
            .map(|(distro, packages)| (distro.as_str(), packages))
    }

    pub fn contains(&self, distro: &str) -> bool {
        self.find(distro).is_some()
    }

    fn find(&self, distro: &str) -> Option<(&str, &LinuxOSPackages)> {
        self.distributions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(distro.trim()))
            .map(|(key, packages)| (key.as_str(), packages))
    }

    /// Release lists of a distribution (case-insensitive key).
    pub fn packages_for(&self, distro: &str) -> Result<&LinuxOSPackages> {
        self.find(distro)
            .map(|(_, packages)| packages)
            .ok_or_else(|| BootstrapError::UnknownDistribution(distro.to_string()))
    }

    /// Ordered packages to install on `distro`, for the release matching
    /// `version` and the host `arch`.
    pub fn lookup(
        &self,
        distro: &str,
        version: Option<&str>,
        arch: Option<CpuArch>,
    ) -> Result<Vec<&LinuxPackage>> {
        self.resolve(distro, version, arch)
            .map(|(_, _, packages)| packages)
    }

    fn resolve(
        &self,
        distro: &str,
        version: Option<&str>,
        arch: Option<CpuArch>,
    ) -> Result<(&str, &str, Vec<&LinuxPackage>)> {
        let (key, os_packages) = self
            .find(distro)
            .ok_or_else(|| BootstrapError::UnknownDistribution(distro.to_string()))?;
        let (release, packages) = os_packages.select(version);
        let packages: Vec<&LinuxPackage> =
            packages.iter().filter(|p| p.applies_to(arch)).collect();

        if packages.is_empty() {
            return Err(BootstrapError::UnsupportedPlatform {
                os: format!("{key} {release}"),
                arch: arch.map_or_else(|| "unknown".to_string(), |a| a.to_string()),
            });
        }
        Ok((key, release, packages))
    }

    /// Remediation for the host distribution. `ID` is tried first, then each
    /// `ID_LIKE` parent.
    pub fn remediation(&self, os: &OsRelease, arch: Option<CpuArch>) -> Result<Remediation> {
        let Some(distro) = os.candidate_keys().find(|key| self.contains(key)) else {
            let name = if os.id.is_empty() { "unknown" } else { os.id.as_str() };
            return Err(BootstrapError::UnknownDistribution(name.to_string()));
        };

        let (key, release, packages) = self.resolve(distro, os.version_id.as_deref(), arch)?;
        Ok(Remediation {
            distribution: key.to_string(),
            release: release.to_string(),
            packages: packages.into_iter().cloned().collect(),
        })
    }
}

/// What the user has to install by hand when no native runtime was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remediation {
    pub distribution: String,
    pub release: String,
    pub packages: Vec<LinuxPackage>,
}

impl Remediation {
    /// One command per package manager, in first-appearance order.
    pub fn install_hints(&self) -> Vec<String> {
        let mut grouped: IndexMap<PackageManager, Vec<&str>> = IndexMap::new();
        for package in &self.packages {
            grouped
                .entry(package.manager)
                .or_default()
                .push(package.package.as_str());
        }
        grouped
            .into_iter()
            .map(|(manager, packages)| manager.install_hint(packages))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apt(name: &str) -> LinuxPackage {
        LinuxPackage::new(PackageManager::Apt, name)
    }

    fn sample_catalog() -> PackageCatalog {
        let ubuntu = LinuxOSPackages::new(IndexMap::from([
            (
                "18.04".to_string(),
                vec![apt("libvlc-dev"), apt("libvlccore9")],
            ),
            (
                "22.04".to_string(),
                vec![
                    apt("libvlc-dev"),
                    apt("vlc-plugin-base").with_arch(CpuArch::X86_64),
                ],
            ),
            (LATEST.to_string(), vec![apt("libvlc-dev")]),
        ]))
        .unwrap();
        let arch = LinuxOSPackages::latest(vec![LinuxPackage::new(PackageManager::Pacman, "vlc")])
            .unwrap();
        let debian = LinuxOSPackages::latest(vec![apt("libvlc5"), apt("vlc-plugin-base")]).unwrap();

        PackageCatalog::new(IndexMap::from([
            ("ubuntu".to_string(), ubuntu),
            ("arch".to_string(), arch),
            ("debian".to_string(), debian),
        ]))
        .unwrap()
    }

    #[test]
    fn test_lookup_known_distribution() {
        let catalog = sample_catalog();
        let packages = catalog.lookup("ubuntu", None, None).unwrap();
        assert_eq!(packages, vec![&apt("libvlc-dev")]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = sample_catalog();
        assert!(catalog.lookup("Arch", None, None).is_ok());
    }

    #[test]
    fn test_lookup_unknown_distribution() {
        let catalog = sample_catalog();
        let err = catalog.lookup("gentoo", None, None).unwrap_err();
        assert!(matches!(err, BootstrapError::UnknownDistribution(ref d) if d == "gentoo"));
    }

    #[test]
    fn test_release_selection() {
        let catalog = sample_catalog();
        let ubuntu = catalog.packages_for("ubuntu").unwrap();

        assert_eq!(ubuntu.select(Some("18.04")).0, "18.04");
        assert_eq!(ubuntu.select(Some("22.04.3")).0, "22.04");
        assert_eq!(ubuntu.select(Some("24.04")).0, LATEST);
        assert_eq!(ubuntu.select(None).0, LATEST);
        // "118.04" must not be taken for "18.04"
        assert_eq!(ubuntu.select(Some("118.04")).0, LATEST);
    }

    #[test]
    fn test_select_falls_back_to_first_release_without_latest() {
        let packages =
            LinuxOSPackages::new(IndexMap::from([("7".to_string(), vec![apt("vlc")])])).unwrap();
        assert_eq!(packages.select(Some("9")).0, "7");
    }

    #[test]
    fn test_arch_filtering_preserves_order() {
        let catalog = sample_catalog();

        let x86 = catalog
            .lookup("ubuntu", Some("22.04"), Some(CpuArch::X86_64))
            .unwrap();
        assert_eq!(x86.len(), 2);
        assert_eq!(x86[0].package, "libvlc-dev");
        assert_eq!(x86[1].package, "vlc-plugin-base");

        let arm = catalog
            .lookup("ubuntu", Some("22.04"), Some(CpuArch::Aarch64))
            .unwrap();
        assert_eq!(arm, vec![&apt("libvlc-dev")]);
    }

    #[test]
    fn test_arch_only_release_is_unsupported_elsewhere() {
        let packages = LinuxOSPackages::latest(vec![apt("vlc-bin").with_arch(CpuArch::X86_64)])
            .unwrap();
        let catalog =
            PackageCatalog::new(IndexMap::from([("kali".to_string(), packages)])).unwrap();
        let err = catalog
            .lookup("kali", None, Some(CpuArch::Arm))
            .unwrap_err();
        assert!(matches!(err, BootstrapError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn test_remediation_follows_id_like() {
        let catalog = sample_catalog();
        let os = OsRelease::parse("ID=pop\nID_LIKE=\"ubuntu debian\"\nVERSION_ID=\"18.04\"\n");

        let remediation = catalog.remediation(&os, Some(CpuArch::X86_64)).unwrap();
        assert_eq!(remediation.distribution, "ubuntu");
        assert_eq!(remediation.release, "18.04");
        assert_eq!(
            remediation.install_hints(),
            vec!["sudo apt install libvlc-dev libvlccore9"]
        );
    }

    #[test]
    fn test_remediation_unknown_names_id() {
        let catalog = sample_catalog();
        let os = OsRelease::parse("ID=nixos\n");
        let err = catalog.remediation(&os, None).unwrap_err();
        assert!(matches!(err, BootstrapError::UnknownDistribution(ref d) if d == "nixos"));
    }

    #[test]
    fn test_install_hints_group_by_manager() {
        let remediation = Remediation {
            distribution: "fedora".into(),
            release: LATEST.into(),
            packages: vec![
                LinuxPackage::new(PackageManager::Dnf, "vlc"),
                LinuxPackage::new(PackageManager::Dnf, "vlc-devel"),
                LinuxPackage::new(PackageManager::Yum, "vlc-core"),
            ],
        };
        assert_eq!(
            remediation.install_hints(),
            vec!["sudo dnf install vlc vlc-devel", "sudo yum install vlc-core"]
        );
    }

    #[test]
    fn test_invariants_rejected_at_construction() {
        assert!(LinuxOSPackages::latest(vec![]).is_err());
        assert!(LinuxOSPackages::latest(vec![apt("  ")]).is_err());
        assert!(LinuxOSPackages::new(IndexMap::new()).is_err());
        assert!(PackageCatalog::new(IndexMap::new()).is_err());
    }

    #[test]
    fn test_bundled_catalog_has_ubuntu() {
        let catalog = PackageCatalog::load(&BundledResources).unwrap();
        let packages = catalog.lookup("ubuntu", None, CpuArch::current()).unwrap();
        assert!(!packages.is_empty());
        assert!(packages.iter().all(|p| p.manager == PackageManager::Apt));
    }

    #[test]
    fn test_catalog_shared_across_threads() {
        let catalog = std::sync::Arc::new(sample_catalog());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let catalog = std::sync::Arc::clone(&catalog);
                std::thread::spawn(move || catalog.lookup("debian", None, None).unwrap().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
    }
}
