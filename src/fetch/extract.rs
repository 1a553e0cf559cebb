use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use walkdir::WalkDir;

use super::table::ArchiveFormat;
use crate::discovery::LibraryMatcher;
use crate::error::{BootstrapError, Result};

/// External tool and arguments that unpack `format` into `dest`.
fn extract_command(format: ArchiveFormat, archive: &Path, dest: &Path) -> (&'static str, Vec<std::ffi::OsString>) {
    let archive = archive.as_os_str().to_os_string();
    let dest = dest.as_os_str().to_os_string();
    match format {
        ArchiveFormat::TarGz => ("tar", vec!["-xzf".into(), archive, "-C".into(), dest]),
        ArchiveFormat::TarXz => ("tar", vec!["-xJf".into(), archive, "-C".into(), dest]),
        ArchiveFormat::TarZst => ("tar", vec!["--zstd".into(), "-xf".into(), archive, "-C".into(), dest]),
        // bsdtar on Windows reads zip archives
        ArchiveFormat::Zip if cfg!(windows) => ("tar", vec!["-xf".into(), archive, "-C".into(), dest]),
        ArchiveFormat::Zip => ("unzip", vec!["-q".into(), "-o".into(), archive, "-d".into(), dest]),
    }
}

/// Unpack `archive` into the existing directory `dest`.
pub async fn extract_archive(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    let (tool, args) = extract_command(format, archive, dest);
    which::which(tool).map_err(|_| {
        BootstrapError::extraction(archive, format!("'{tool}' is required but was not found in PATH"))
    })?;

    let output = Command::new(tool)
        .args(&args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BootstrapError::extraction(archive, format!("failed to run {tool}: {e}")))?;

    if !output.status.success() {
        return Err(BootstrapError::extraction(
            archive,
            format!(
                "{tool} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }
    Ok(())
}

/// Directory holding the runtime library inside an extracted tree.
///
/// The shallowest match wins; ties go to the first path in name order.
pub fn find_library_dir(extracted: &Path, matcher: &LibraryMatcher) -> Option<PathBuf> {
    WalkDir::new(extracted)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter(|entry| entry.file_name().to_str().is_some_and(|n| matcher.matches(n)))
        .min_by_key(|entry| entry.depth())
        .and_then(|entry| entry.path().parent().map(Path::to_path_buf))
}

/// Move every entry of `src_dir` into `dest`, replacing entries with the same name.
pub fn install_tree(src_dir: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src_dir)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        remove_existing(&target)?;
        fs::rename(entry.path(), &target)?;
    }
    Ok(())
}

fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)?,
        Ok(_) => fs::remove_file(path)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
