//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// Provides persistent storage using OS file APIs. Data survives
/// process restarts.
///
/// # Positioning
///
/// The file cursor is private to the backend: every operation seeks
/// under the internal lock, so reads never disturb where the next
/// append lands. `append` computes its offset from the tracked length
/// while holding the lock, which keeps concurrent appends on disjoint,
/// consecutive ranges.
///
/// # Durability
///
/// - `flush()` pushes buffered data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
///
/// # Example
///
/// ```no_run
/// use cairn_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("data.bin")).unwrap();
/// let offset = backend.append(b"persistent data").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    len: RwLock<u64>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// If the file exists it is opened for reading and appending,
    /// otherwise a new empty file is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            len: RwLock::new(len),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.len.read();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&self, data: &[u8]) -> StorageResult<u64> {
        if data.is_empty() {
            return Ok(*self.len.read());
        }

        let mut file = self.file.lock();
        let mut len = self.len.write();

        let offset = *len;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        *len += data.len() as u64;

        Ok(offset)
    }

    fn flush(&self) -> StorageResult<()> {
        let mut file = self.file.lock();
        file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.len.read())
    }

    fn sync(&self) -> StorageResult<()> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }

    fn truncate(&self, new_size: u64) -> StorageResult<()> {
        let file = self.file.lock();
        let mut len = self.len.write();

        if new_size > *len {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size: *len,
            });
        }

        file.set_len(new_size)?;
        *len = new_size;

        Ok(())
    }
}
