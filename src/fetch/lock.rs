use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::error::{BootstrapError, Result};
use crate::ui::prelude::*;

/// Lock file other `vlcfetch` processes coordinate on.
pub const LOCK_FILE: &str = ".vlcfetch.lock";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-directory install locks for this process. Other processes are kept
/// out by [`InstallLock`].
///
/// Two installs into the same destination run one after the other; installs
/// into different destinations do not wait for each other. Keys should be
/// canonical paths.
#[derive(Debug, Default)]
pub struct DirectoryLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

static GLOBAL: LazyLock<DirectoryLocks> = LazyLock::new(DirectoryLocks::default);

impl DirectoryLocks {
    pub fn global() -> &'static DirectoryLocks {
        &GLOBAL
    }

    /// Wait for exclusive use of `dir`. Released when the guard drops.
    pub async fn acquire(&self, dir: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(dir.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Advisory OS lock on `<dir>/.vlcfetch.lock`, held until dropped.
#[derive(Debug)]
pub struct InstallLock {
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl InstallLock {
    /// Take the lock without waiting. `Ok(None)` means another holder has it.
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::fcntl::{Flock, FlockArg};

            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => Ok(Some(Self { _lock: lock })),
                Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
                Err((_, errno)) => Err(std::io::Error::from(errno).into()),
            }
        }

        #[cfg(not(unix))]
        {
            match file.try_lock() {
                Ok(()) => Ok(Some(Self { _file: file })),
                Err(std::fs::TryLockError::WouldBlock) => Ok(None),
                Err(std::fs::TryLockError::Error(e)) => Err(e.into()),
            }
        }
    }
}

/// Exclusive use of one install directory, within this process and across
/// processes.
#[derive(Debug)]
pub struct DirectoryGuard {
    _file: InstallLock,
    _process: OwnedMutexGuard<()>,
}

/// Wait until `dir` is free. `dir` must exist and should be canonical.
pub async fn lock_directory(dir: &Path, cancel: &CancellationToken) -> Result<DirectoryGuard> {
    let process = tokio::select! {
        _ = cancel.cancelled() => return Err(BootstrapError::Cancelled),
        guard = DirectoryLocks::global().acquire(dir) => guard,
    };

    let mut announced = false;
    loop {
        if let Some(file) = InstallLock::try_acquire(dir)? {
            return Ok(DirectoryGuard {
                _file: file,
                _process: process,
            });
        }
        if !announced {
            emit(
                Level::Info,
                "fetch.lock.wait",
                &format!(
                    "{} Another vlcfetch is installing into {}; waiting",
                    char::from(NerdFont::Lock),
                    dir.display()
                ),
                None,
            );
            announced = true;
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(BootstrapError::Cancelled),
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}
