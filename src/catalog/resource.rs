use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::{BootstrapError, Result};

/// Source of named, read-only resources such as the package catalog.
pub trait ResourceLoader: Send + Sync {
    /// Raw bytes of the resource `name`, or `ResourceNotFound`.
    fn load(&self, name: &str) -> Result<Cow<'static, [u8]>>;
}

/// Resources compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledResources;

const BUNDLED: &[(&str, &[u8])] = &[(
    super::CATALOG_RESOURCE,
    include_bytes!("../../resources/linux-package-installation.json"),
)];

impl ResourceLoader for BundledResources {
    fn load(&self, name: &str) -> Result<Cow<'static, [u8]>> {
        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .map(|(_, bytes)| Cow::Borrowed(*bytes))
            .ok_or_else(|| BootstrapError::ResourceNotFound {
                name: name.to_string(),
            })
    }
}

/// Resources read from a directory on disk, e.g. a user supplied catalog.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceLoader for DirectoryResources {
    fn load(&self, name: &str) -> Result<Cow<'static, [u8]>> {
        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Cow::Owned(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BootstrapError::ResourceNotFound {
                name: path.display().to_string(),
            }),
            Err(e) => Err(BootstrapError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CATALOG_RESOURCE, PackageCatalog};
    use tempfile::TempDir;

    #[test]
    fn test_bundled_catalog_present() {
        let bytes = BundledResources.load(CATALOG_RESOURCE).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_bundled_missing_resource() {
        let err = BundledResources.load("missing.json").unwrap_err();
        assert!(matches!(err, BootstrapError::ResourceNotFound { ref name } if name == "missing.json"));
    }

    #[test]
    fn test_directory_resources() {
        let dir = TempDir::new().unwrap();
        let loader = DirectoryResources::new(dir.path());

        let err = PackageCatalog::load(&loader).unwrap_err();
        assert!(matches!(err, BootstrapError::ResourceNotFound { .. }));

        fs::write(
            dir.path().join(CATALOG_RESOURCE),
            r#"{"void": [{"manager": "xbps", "package": "vlc-devel"}]}"#,
        )
        .unwrap();
        let catalog = PackageCatalog::load(&loader).unwrap();
        assert!(catalog.contains("void"));
    }

    #[test]
    fn test_directory_catalog_must_be_valid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CATALOG_RESOURCE), b"{\"void\": 3}").unwrap();
        let err = PackageCatalog::load(&DirectoryResources::new(dir.path())).unwrap_err();
        assert!(matches!(err, BootstrapError::MalformedCatalog(_)));
    }
}
