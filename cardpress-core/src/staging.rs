//! Disposable workspace for one deployment attempt.
//!
//! [`StagingArea::prepare`] takes the single-flight lock for the staging path,
//! wipes whatever a previous run left behind and recreates an empty tree with
//! an `assets/` directory. The tree and the lock are released by
//! [`StagingArea::cleanup`] or, on any other exit path, by `Drop`.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{LockHolder, StagingError};

pub const ASSETS_DIR: &str = "assets";

/// Exclusive claim on a staging path, held as a `<staging_dir>.lock` file.
///
/// The file is created with `create_new`, so a second deployment in this or
/// any other process fails fast instead of sharing the tree.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
}

impl DeployLock {
    pub fn lock_path(staging_root: &Path) -> Result<PathBuf, StagingError> {
        let name = staging_root
            .file_name()
            .ok_or_else(|| StagingError::InvalidRoot(staging_root.to_path_buf()))?;
        let mut lock_name = name.to_os_string();
        lock_name.push(".lock");
        Ok(staging_root.with_file_name(lock_name))
    }

    pub fn acquire(staging_root: &Path) -> Result<Self, StagingError> {
        let path = Self::lock_path(staging_root)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StagingError::io("create parent directory", parent, e))?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = Self::holder(&path);
                warn!(lock = %path.display(), holder = ?holder.0, "Staging area already locked");
                return Err(StagingError::Locked { path, holder });
            }
            Err(e) => return Err(StagingError::io("create lock file", &path, e)),
        };
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            warn!(error = %e, lock = %path.display(), "Failed to record pid in lock file");
        }
        debug!(lock = %path.display(), "Acquired deployment lock");
        Ok(Self { path })
    }

    /// Pid written into an existing lock file by its holder.
    pub fn holder(lock_path: &Path) -> LockHolder {
        let pid = fs::read_to_string(lock_path)
            .ok()
            .and_then(|contents| contents.trim().parse().ok());
        LockHolder(pid)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(lock = %self.path.display(), "Released deployment lock"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                error = ?e,
                lock = %self.path.display(),
                "Failed to release deployment lock"
            ),
        }
    }
}

#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    lock: Option<DeployLock>,
}

impl StagingArea {
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let root = root.into();
        let lock = DeployLock::acquire(&root)?;
        let area = Self {
            root,
            lock: Some(lock),
        };
        area.reset()?;
        info!(path = %area.root.display(), "Prepared staging area");
        Ok(area)
    }

    fn reset(&self) -> Result<(), StagingError> {
        remove_tree(&self.root)?;
        fs::create_dir_all(&self.root)
            .map_err(|e| StagingError::io("create staging directory", &self.root, e))?;
        let assets = self.assets_dir();
        fs::create_dir(&assets)
            .map_err(|e| StagingError::io("create assets directory", &assets, e))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    pub fn record_dir(&self, employee_id: &str) -> PathBuf {
        self.root.join(employee_id)
    }

    /// Remove the tree and release the lock. The lock is released even when
    /// removal fails; the next `prepare` wipes the leftovers.
    pub fn cleanup(mut self) -> Result<(), StagingError> {
        let result = remove_tree(&self.root);
        self.lock.take();
        if result.is_ok() {
            info!(path = %self.root.display(), "Cleaned up staging area");
        }
        result
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.lock.is_none() {
            return;
        }
        match remove_tree(&self.root) {
            Ok(()) => debug!(path = %self.root.display(), "Staging area removed on drop"),
            Err(e) => warn!(error = %e, "Failed to remove staging area"),
        }
    }
}

fn remove_tree(path: &Path) -> Result<(), StagingError> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed existing staging tree");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StagingError::io("remove", path, e)),
    }
}
