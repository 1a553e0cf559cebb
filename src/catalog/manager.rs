//! Distribution package managers referenced by the catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A distribution's native package tool. Only ever named in install hints,
/// never invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    /// APT - Debian/Ubuntu family
    Apt,
    /// DNF - Fedora/RHEL 8+ family
    Dnf,
    /// YUM - older RHEL/CentOS
    Yum,
    /// Pacman - Arch Linux family
    Pacman,
    /// Zypper - openSUSE
    Zypper,
    /// apk - Alpine
    Apk,
    /// Portage - Gentoo
    Emerge,
    /// XBPS - Void Linux
    Xbps,
    /// eopkg - Solus
    Eopkg,
}

impl PackageManager {
    /// Name as it appears in the catalog JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
            Self::Apk => "apk",
            Self::Emerge => "emerge",
            Self::Xbps => "xbps",
            Self::Eopkg => "eopkg",
        }
    }

    /// Command prefix a user runs to install packages with this manager.
    pub fn install_command(&self) -> &'static str {
        match self {
            Self::Apt => "sudo apt install",
            Self::Dnf => "sudo dnf install",
            Self::Yum => "sudo yum install",
            Self::Pacman => "sudo pacman -S",
            Self::Zypper => "sudo zypper install",
            Self::Apk => "sudo apk add",
            Self::Emerge => "sudo emerge",
            Self::Xbps => "sudo xbps-install",
            Self::Eopkg => "sudo eopkg install",
        }
    }

    /// Build the full install hint for a set of package names.
    pub fn install_hint<'a>(&self, packages: impl IntoIterator<Item = &'a str>) -> String {
        let mut hint = self.install_command().to_string();
        for package in packages {
            hint.push(' ');
            hint.push_str(package);
        }
        hint
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
