pub mod distro;
pub mod paths;
pub mod platform;
pub mod progress;

pub use distro::OsRelease;
pub use platform::{CpuArch, OsFamily, Platform};
