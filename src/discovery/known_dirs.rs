//! Conventional install locations of the native runtime per OS family.

use std::env;
use std::path::PathBuf;

use crate::common::{OsFamily, Platform};

/// File name patterns of the primary runtime library, most specific first.
pub fn library_patterns(os: OsFamily) -> &'static [&'static str] {
    match os {
        OsFamily::Linux => &["libvlc.so", "libvlc.so.*"],
        OsFamily::MacOs => &["libvlc.dylib", "libvlc.*.dylib"],
        OsFamily::Windows => &["libvlc.dll"],
    }
}

/// Default search directories for `platform`, in probe order.
pub fn system_search_dirs(platform: Platform) -> Vec<PathBuf> {
    match platform.os {
        OsFamily::Linux => {
            let multiarch = platform.arch.multiarch_triple();
            vec![
                PathBuf::from("/usr/lib"),
                PathBuf::from("/usr/lib64"),
                PathBuf::from("/usr/local/lib"),
                PathBuf::from(format!("/usr/lib/{multiarch}")),
                PathBuf::from("/snap/vlc/current/usr/lib"),
            ]
        }
        OsFamily::MacOs => {
            const BUNDLE_LIB: &str = "Applications/VLC.app/Contents/MacOS/lib";
            let mut found = vec![PathBuf::from("/").join(BUNDLE_LIB)];
            if let Some(home) = dirs::home_dir() {
                found.push(home.join(BUNDLE_LIB));
            }
            found
        }
        OsFamily::Windows => ["ProgramFiles", "ProgramFiles(x86)"]
            .iter()
            .map(|var| {
                env::var_os(var)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| match *var {
                        "ProgramFiles" => PathBuf::from(r"C:\Program Files"),
                        _ => PathBuf::from(r"C:\Program Files (x86)"),
                    })
                    .join("VideoLAN")
                    .join("VLC")
            })
            .collect(),
    }
}
