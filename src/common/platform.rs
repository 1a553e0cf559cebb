//! Host operating system and CPU architecture detection.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BootstrapError, Result};

/// Operating system families the native runtime ships for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
}

impl OsFamily {
    /// The family of the running process, if it is one we know.
    pub fn current() -> Option<Self> {
        Self::from_name(env::consts::OS)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" | "mac" | "osx" | "darwin" => Some(Self::MacOs),
            "windows" | "win" | "win32" | "win64" => Some(Self::Windows),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CPU architectures, normalised from the many names distributions use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuArch {
    X86_64,
    X86,
    Aarch64,
    Arm,
}

impl CpuArch {
    pub fn current() -> Option<Self> {
        Self::from_name(env::consts::ARCH)
    }

    /// Parse an architecture name or one of its aliases (`amd64`, `armhf`, `i686`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" | "x86-64" => Some(Self::X86_64),
            "x86" | "i386" | "i486" | "i586" | "i686" => Some(Self::X86),
            "aarch64" | "arm64" | "armv8" => Some(Self::Aarch64),
            "arm" | "armhf" | "armhfp" | "armv7" | "armv7h" | "armv7hl" | "armv7l" => {
                Some(Self::Arm)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
        }
    }

    /// Debian-style multiarch library directory name.
    pub fn multiarch_triple(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64-linux-gnu",
            Self::X86 => "i386-linux-gnu",
            Self::Aarch64 => "aarch64-linux-gnu",
            Self::Arm => "arm-linux-gnueabihf",
        }
    }
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: OsFamily,
    pub arch: CpuArch,
}

impl Platform {
    pub const fn new(os: OsFamily, arch: CpuArch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform of the running process.
    pub fn current() -> Result<Self> {
        match (OsFamily::current(), CpuArch::current()) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(BootstrapError::UnsupportedPlatform {
                os: env::consts::OS.to_string(),
                arch: env::consts::ARCH.to_string(),
            }),
        }
    }

    /// Stable key such as `linux-x86_64`, used for checksum overrides.
    pub fn key(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
