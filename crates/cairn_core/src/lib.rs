//! Cairn: an embedded, file-backed key-value blob store.
//!
//! A store lives in one working folder holding an append-only data
//! file, a JSON index snapshot and a lock file. Blobs are written once
//! under a unique key and read back by key; there are no updates or
//! deletes. Payloads can be deflate-compressed and AES-encrypted on
//! their way to disk, per record.
//!
//! Durability is governed by a [`FlushMode`]:
//!
//! - [`FlushMode::AtOnce`] - every add is synced before it returns
//! - [`FlushMode::Deferred`] - a background worker commits batches on
//!   an interval
//! - [`FlushMode::Manual`] - batches commit only on [`BinaryStore::flush`]
//!
//! ```rust,no_run
//! use cairn_core::{BinaryStore, StorageConfiguration, StreamInfo};
//!
//! # fn main() -> cairn_core::CairnResult<()> {
//! let config = StorageConfiguration::new("/var/lib/cairn")
//!     .enable_encryption(&[0x42; 32])?;
//! let store = BinaryStore::open(config)?;
//!
//! store.add("doc-1", b"contents", StreamInfo::compressed_and_encrypted())?;
//! let contents = store.get("doc-1")?;
//! # assert_eq!(contents, b"contents");
//! store.close();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod crypto;
mod dir;
mod error;
mod handlers;
mod index;
mod observer;
mod pipeline;
mod store;

pub use config::{FlushMode, StorageConfiguration, DEFAULT_FLUSH_INTERVAL};
pub use crypto::{EncryptionKey, IV_SIZE, VALID_KEY_SIZES};
pub use dir::{INDEX_FILE, LOCK_FILE, STORAGE_FILE};
pub use error::{CairnError, CairnResult};
pub use index::{DataProperties, DataReference, Index, IndexRecord};
pub use observer::{FlushKind, NoopObserver, StatsSnapshot, StoreObserver, StoreStats};
pub use pipeline::StreamInfo;
pub use store::BinaryStore;
