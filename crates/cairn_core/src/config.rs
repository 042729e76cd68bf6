//! Store configuration.

use crate::crypto::EncryptionKey;
use crate::error::CairnResult;
use crate::observer::{NoopObserver, StoreObserver};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default interval between background flushes in deferred mode.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// When added records become durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Every add is committed synchronously before it returns.
    AtOnce,
    /// Adds are queued and a background worker commits them
    /// periodically.
    Deferred {
        /// Pause between background flush passes.
        interval: Duration,
    },
    /// Adds are queued and committed only by an explicit flush call.
    Manual,
}

impl FlushMode {
    /// Short name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AtOnce => "at-once",
            Self::Deferred { .. } => "deferred",
            Self::Manual => "manual",
        }
    }
}

/// Configuration of a store instance, built fluently.
///
/// # Example
///
/// ```rust,no_run
/// use cairn_core::StorageConfiguration;
/// use std::time::Duration;
///
/// let config = StorageConfiguration::new("/var/lib/cairn")
///     .flush_mode_deferred(Some(Duration::from_millis(50)))
///     .enable_encryption(&[0x42; 32])
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StorageConfiguration {
    working_folder: PathBuf,
    flush_mode: FlushMode,
    encryption_key: Option<EncryptionKey>,
    observer: Arc<dyn StoreObserver>,
}

impl StorageConfiguration {
    /// Creates a configuration for the given working folder with the
    /// synchronous at-once flush mode and no encryption.
    ///
    /// The folder must already exist when the store is opened.
    pub fn new(working_folder: impl Into<PathBuf>) -> Self {
        Self {
            working_folder: working_folder.into(),
            flush_mode: FlushMode::AtOnce,
            encryption_key: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Switches to deferred flushing with a background worker.
    ///
    /// `interval` defaults to [`DEFAULT_FLUSH_INTERVAL`] when `None`.
    #[must_use]
    pub fn flush_mode_deferred(mut self, interval: Option<Duration>) -> Self {
        self.flush_mode = FlushMode::Deferred {
            interval: interval.unwrap_or(DEFAULT_FLUSH_INTERVAL),
        };
        self
    }

    /// Switches to manual flushing: records queue until an explicit
    /// flush call.
    #[must_use]
    pub fn flush_mode_manual(mut self) -> Self {
        self.flush_mode = FlushMode::Manual;
        self
    }

    /// Switches back to the default synchronous at-once flushing.
    #[must_use]
    pub fn flush_mode_at_once(mut self) -> Self {
        self.flush_mode = FlushMode::AtOnce;
        self
    }

    /// Enables AES encryption with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::InvalidKeySize`](crate::CairnError::InvalidKeySize)
    /// if the key is not 16, 24 or 32 bytes.
    pub fn enable_encryption(mut self, key: &[u8]) -> CairnResult<Self> {
        self.encryption_key = Some(EncryptionKey::from_bytes(key)?);
        Ok(self)
    }

    /// Installs an observer that receives store activity callbacks.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configured working folder.
    #[must_use]
    pub fn working_folder(&self) -> &Path {
        &self.working_folder
    }

    /// The configured flush mode.
    #[must_use]
    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    pub(crate) fn encryption_key(&self) -> Option<&EncryptionKey> {
        self.encryption_key.as_ref()
    }

    pub(crate) fn observer_handle(&self) -> Arc<dyn StoreObserver> {
        Arc::clone(&self.observer)
    }
}

impl fmt::Debug for StorageConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfiguration")
            .field("working_folder", &self.working_folder)
            .field("flush_mode", &self.flush_mode)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}
