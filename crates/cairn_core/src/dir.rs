//! Working folder layout and exclusive locking.
//!
//! A store occupies one pre-existing folder containing:
//!
//! - `storage.bin` - the append-only data file
//! - `index.json`  - the whole-snapshot index
//! - `LOCK`        - an advisory lock guarding single-instance access

use crate::error::{CairnError, CairnResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the data file inside the working folder.
pub const STORAGE_FILE: &str = "storage.bin";
/// Name of the index file inside the working folder.
pub const INDEX_FILE: &str = "index.json";
/// Name of the lock file inside the working folder.
pub const LOCK_FILE: &str = "LOCK";

/// An opened, exclusively locked working folder.
///
/// The advisory lock is held for the lifetime of this value and
/// released by the OS when the lock file handle drops, including on
/// process death.
#[derive(Debug)]
pub(crate) struct StoreDir {
    path: PathBuf,
    _lock: File,
}

impl StoreDir {
    /// Opens and locks a working folder.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::Config`] if the folder does not exist or
    /// is not a directory, and [`CairnError::StoreLocked`] if another
    /// store instance holds the lock.
    pub(crate) fn open(path: &Path) -> CairnResult<Self> {
        if !path.is_dir() {
            return Err(CairnError::config(format!(
                "working folder {} does not exist or is not a directory",
                path.display()
            )));
        }

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        lock.try_lock_exclusive()
            .map_err(|_| CairnError::StoreLocked)?;

        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    pub(crate) fn data_path(&self) -> PathBuf {
        self.path.join(STORAGE_FILE)
    }

    pub(crate) fn index_path(&self) -> PathBuf {
        self.path.join(INDEX_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_folder_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            StoreDir::open(&missing),
            Err(CairnError::Config { .. })
        ));
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempfile::tempdir().unwrap();

        let first = StoreDir::open(dir.path()).unwrap();
        assert!(matches!(
            StoreDir::open(dir.path()),
            Err(CairnError::StoreLocked)
        ));
        drop(first);

        // Releasing the first handle frees the folder again.
        StoreDir::open(dir.path()).unwrap();
    }

    #[test]
    fn paths_are_inside_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = StoreDir::open(dir.path()).unwrap();

        assert_eq!(store_dir.data_path(), dir.path().join("storage.bin"));
        assert_eq!(store_dir.index_path(), dir.path().join("index.json"));
    }
}
