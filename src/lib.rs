//! Bootstrap for the native libVLC runtime: fetch a prebuilt copy, find an
//! installed one, or tell the user which system packages provide it.

pub mod catalog;
pub mod common;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod resolve;
pub mod ui;

pub use catalog::{LinuxOSPackages, LinuxPackage, PackageCatalog, PackageManager, Remediation};
pub use common::{CpuArch, OsFamily, OsRelease, Platform};
pub use config::{BootstrapConfig, RetryConfig};
pub use discovery::{DiscoveryResult, NativeDiscovery};
pub use error::{BootstrapError, DownloadErrorKind, Result};
pub use fetch::{FetchOutcome, NativeFetcher};
pub use resolve::{Resolution, Resolver};
