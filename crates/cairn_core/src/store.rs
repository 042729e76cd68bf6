//! The store facade.

use crate::config::StorageConfiguration;
use crate::dir::StoreDir;
use crate::error::{CairnError, CairnResult};
use crate::handlers::{build_handler, FlushHandler, StoreFiles};
use crate::index::IndexFile;
use crate::observer::StoreObserver;
use crate::pipeline::{StreamInfo, TransformPipeline};
use bytes::Bytes;
use cairn_storage::{FileBackend, StorageBackend};
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};
use std::sync::Arc;

/// An embedded key-value blob store over one working folder.
///
/// Keys are caller-supplied non-empty strings; values are opaque byte
/// blobs, optionally compressed and/or encrypted on their way to the
/// append-only data file. Record locations live in a separate index
/// file that is rewritten as a whole snapshot on every flush.
///
/// All methods take `&self`; the store is safe to share across threads
/// behind an [`Arc`].
///
/// # Example
///
/// ```rust,no_run
/// use cairn_core::{BinaryStore, StorageConfiguration, StreamInfo};
///
/// # fn main() -> cairn_core::CairnResult<()> {
/// let store = BinaryStore::open(StorageConfiguration::new("/var/lib/cairn"))?;
/// store.add("greeting", b"hello", StreamInfo::compressed())?;
/// assert_eq!(store.get("greeting")?, b"hello");
/// store.close();
/// # Ok(())
/// # }
/// ```
pub struct BinaryStore {
    /// `None` once closed; everything holding OS resources lives here
    /// so closing releases the file handles and the folder lock.
    inner: RwLock<Option<StoreInner>>,
    pipeline: TransformPipeline,
    observer: Arc<dyn StoreObserver>,
}

struct StoreInner {
    handler: Box<dyn FlushHandler>,
    _dir: StoreDir,
}

impl BinaryStore {
    /// Opens the store described by `config`.
    ///
    /// The working folder must exist; the data, index and lock files
    /// are created inside it on first open. Startup verifies that the
    /// index and the data file agree before any operation is allowed.
    ///
    /// # Errors
    ///
    /// - [`CairnError::Config`] if the working folder is missing
    /// - [`CairnError::StoreLocked`] if another instance has it open
    /// - [`CairnError::IndexCorrupted`] if the index does not parse or
    ///   its records are not contiguous from offset zero
    /// - [`CairnError::StorageCorrupted`] if the data file length does
    ///   not match the sum of indexed record lengths
    pub fn open(config: StorageConfiguration) -> CairnResult<Self> {
        let dir = StoreDir::open(config.working_folder())?;

        let data: Arc<dyn StorageBackend> = Arc::new(FileBackend::open(&dir.data_path())?);
        let index_file = IndexFile::new(Box::new(FileBackend::open(&dir.index_path())?));

        let index = index_file.load()?;
        index.check_contiguous()?;
        let expected = index.expected_data_len();
        let actual = data.size()?;
        if expected != actual {
            return Err(CairnError::storage_corrupted(format!(
                "data file is {actual} bytes, but the index accounts for {expected}"
            )));
        }

        let pipeline = TransformPipeline::new(config.encryption_key().cloned());
        let observer = config.observer_handle();
        let files = StoreFiles {
            data,
            index: index_file,
            write_lock: Mutex::new(()),
        };
        let handler = build_handler(&config, files, index, Arc::clone(&observer));
        handler.init()?;

        Ok(Self {
            inner: RwLock::new(Some(StoreInner { handler, _dir: dir })),
            pipeline,
            observer,
        })
    }

    /// Stores a blob under `key`, applying the requested transforms.
    ///
    /// The key is booked before the payload is transformed, so of two
    /// concurrent adds with the same key exactly one wins and the other
    /// gets [`CairnError::DuplicateKey`]. When this returns under the
    /// at-once flush mode the record is durable; under the deferred
    /// modes it is queued and immediately readable.
    ///
    /// # Errors
    ///
    /// - [`CairnError::Config`] for an empty key
    /// - [`CairnError::DuplicateKey`] if the key exists in any state
    /// - [`CairnError::EncryptionNotConfigured`] if encryption is
    ///   requested without a key
    /// - [`CairnError::Disposed`] after `close`
    pub fn add(&self, key: &str, data: &[u8], info: StreamInfo) -> CairnResult<()> {
        let inner = self.open_inner()?;
        if key.is_empty() {
            return Err(CairnError::config("key must not be empty"));
        }

        inner.handler.ensure_and_book_key(key)?;
        let (payload, properties) = match self.pipeline.pack(data, info) {
            Ok(packed) => packed,
            Err(err) => {
                inner.handler.release_booking(key);
                return Err(err);
            }
        };

        let stored_bytes = payload.len() as u64;
        inner.handler.add(key, Bytes::from(payload), properties)?;
        self.observer.on_record_added(stored_bytes);
        Ok(())
    }

    /// Retrieves the blob stored under `key`, reversing the transforms
    /// it was written with.
    ///
    /// # Errors
    ///
    /// - [`CairnError::KeyNotFound`] if the key was never committed
    /// - [`CairnError::EncryptionNotConfigured`] if the record is
    ///   encrypted and this instance has no key
    /// - [`CairnError::InvalidEncryptionKey`] if the configured key is
    ///   not the one the record was written with
    /// - [`CairnError::Disposed`] after `close`
    pub fn get(&self, key: &str) -> CairnResult<Vec<u8>> {
        let inner = self.open_inner()?;

        let Some((payload, properties)) = inner.handler.get_record(key)? else {
            return Err(CairnError::key_not_found(key));
        };
        self.pipeline.unpack(&payload, properties)
    }

    /// Whether `key` exists: booked, pending or committed.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::Disposed`] after `close`.
    pub fn contains(&self, key: &str) -> CairnResult<bool> {
        self.open_inner()?.handler.contains(key)
    }

    /// Commits pending records now.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::FlushNotSupported`] under the deferred
    /// interval mode, whose background worker is the only committer,
    /// and [`CairnError::Disposed`] after `close`.
    pub fn flush(&self) -> CairnResult<()> {
        self.open_inner()?.handler.flush()
    }

    /// Closes the store: commits what the flush policy requires, stops
    /// background machinery and releases the folder lock.
    ///
    /// Idempotent and infallible; teardown failures are logged rather
    /// than surfaced. Dropping the store calls this.
    pub fn close(&self) {
        let Some(inner) = self.inner.write().take() else {
            return;
        };
        if let Err(err) = inner.handler.dispose() {
            tracing::warn!(error = %err, "store teardown failed");
        }
        // Dropping `inner` closes the data and index file handles and
        // releases the folder lock.
        drop(inner);
    }

    fn open_inner(&self) -> CairnResult<MappedRwLockReadGuard<'_, StoreInner>> {
        RwLockReadGuard::try_map(self.inner.read(), Option::as_ref)
            .map_err(|_| CairnError::Disposed)
    }
}

impl Drop for BinaryStore {
    fn drop(&mut self) {
        self.close();
    }
}
