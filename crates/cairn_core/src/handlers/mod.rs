//! Flush policy handlers.
//!
//! A handler owns the commit path of a store: how booked records reach
//! the data file and when the index snapshot is rewritten. The three
//! policies share the booking protocol and the snapshot logic here and
//! differ only in when the append happens:
//!
//! - [`AtOnceHandler`] commits synchronously inside every add.
//! - [`IntervalFlushHandler`] queues adds and commits them from a
//!   background worker on a fixed interval.
//! - [`ManualFlushHandler`] queues adds and commits only on an explicit
//!   flush call.

mod at_once;
mod deferred;
mod interval;
mod manual;

pub(crate) use at_once::AtOnceHandler;
pub(crate) use interval::IntervalFlushHandler;
pub(crate) use manual::ManualFlushHandler;

use crate::config::{FlushMode, StorageConfiguration};
use crate::error::{CairnError, CairnResult};
use crate::index::{DataProperties, Index, IndexRecord};
use crate::observer::StoreObserver;
use bytes::Bytes;
use cairn_storage::StorageBackend;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use deferred::DeferredCore;
use parking_lot::Mutex;
use std::sync::Arc;

/// Commit path of one flush policy.
///
/// Handlers are driven by the store facade, which performs the payload
/// transforms and the disposed check before calling in.
pub(crate) trait FlushHandler: Send + Sync {
    /// Starts background machinery, if the policy has any.
    fn init(&self) -> CairnResult<()> {
        Ok(())
    }

    /// Books `key` for an in-flight add, rejecting duplicates.
    ///
    /// A successful booking must be resolved by `add` or, if the
    /// payload transform fails, undone with `release_booking`.
    fn ensure_and_book_key(&self, key: &str) -> CairnResult<()>;

    /// Undoes a booking whose add never happened.
    fn release_booking(&self, key: &str);

    /// Accepts the transformed payload for a previously booked key.
    fn add(&self, key: &str, payload: Bytes, properties: DataProperties) -> CairnResult<()>;

    /// Retrieves a record's stored payload and transform flags, from
    /// the pending set or the data file. `None` means the key is not
    /// readable (absent or only booked).
    fn get_record(&self, key: &str) -> CairnResult<Option<(Bytes, DataProperties)>>;

    /// Whether the key is booked, pending or committed.
    fn contains(&self, key: &str) -> CairnResult<bool>;

    /// Explicitly commits pending records, if the policy allows it.
    fn flush(&self) -> CairnResult<()>;

    /// Commits whatever the policy requires on close and stops
    /// background machinery. Idempotent.
    fn dispose(&self) -> CairnResult<()>;
}

/// Data and index files of an open store.
///
/// `write_lock` serializes the whole commit sequence (append, record
/// install, data flush, index snapshot) so a snapshot never captures a
/// half-committed batch and never overwrites a newer one. Reads do not
/// take it; they use positional reads on the data file.
pub(crate) struct StoreFiles {
    pub(crate) data: Arc<dyn StorageBackend>,
    pub(crate) index: crate::index::IndexFile,
    pub(crate) write_lock: Mutex<()>,
}

/// State shared by every handler: the files, the record table and the
/// observer.
///
/// `records` maps each key to `Some(record)` once committed, or `None`
/// while the key is merely booked for an in-flight add.
pub(crate) struct HandlerShared {
    pub(crate) files: StoreFiles,
    pub(crate) records: DashMap<String, Option<IndexRecord>>,
    pub(crate) observer: Arc<dyn StoreObserver>,
}

impl HandlerShared {
    pub(crate) fn new(
        files: StoreFiles,
        initial: Index,
        observer: Arc<dyn StoreObserver>,
    ) -> Self {
        let records = DashMap::with_capacity(initial.records.len());
        for (key, record) in initial.records {
            records.insert(key, Some(record));
        }
        Self {
            files,
            records,
            observer,
        }
    }

    /// Inserts a booking placeholder unless the key already exists in
    /// any state.
    pub(crate) fn book_key(&self, key: &str) -> CairnResult<()> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(_) => Err(CairnError::duplicate_key(key)),
            Entry::Vacant(slot) => {
                slot.insert(None);
                Ok(())
            }
        }
    }

    /// Removes a booking placeholder, leaving committed records alone.
    pub(crate) fn release_booking(&self, key: &str) {
        self.records.remove_if(key, |_, record| record.is_none());
    }

    pub(crate) fn committed_record(&self, key: &str) -> Option<IndexRecord> {
        self.records.get(key).and_then(|entry| *entry.value())
    }

    /// Reads a committed record's payload from the data file.
    pub(crate) fn read_payload(&self, record: &IndexRecord) -> CairnResult<Bytes> {
        let reference = record.data_reference;
        let bytes = self
            .files
            .data
            .read_at(reference.stream_start, reference.length as usize)?;
        Ok(Bytes::from(bytes))
    }

    /// Collects all committed records into a persistable snapshot,
    /// skipping booking placeholders.
    pub(crate) fn snapshot_index(&self) -> Index {
        let mut index = Index::default();
        for entry in self.records.iter() {
            if let Some(record) = entry.value() {
                index.records.insert(entry.key().clone(), *record);
            }
        }
        index
    }
}

/// Builds the handler for the configured flush mode.
pub(crate) fn build_handler(
    config: &StorageConfiguration,
    files: StoreFiles,
    initial: Index,
    observer: Arc<dyn StoreObserver>,
) -> Box<dyn FlushHandler> {
    let shared = Arc::new(HandlerShared::new(files, initial, observer));
    match config.flush_mode() {
        FlushMode::AtOnce => Box::new(AtOnceHandler::new(shared)),
        FlushMode::Deferred { interval } => Box::new(IntervalFlushHandler::new(
            Arc::new(DeferredCore::new(shared)),
            interval,
        )),
        FlushMode::Manual => {
            Box::new(ManualFlushHandler::new(Arc::new(DeferredCore::new(shared))))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use cairn_storage::InMemoryBackend;

    /// Builds handler state over in-memory backends, returning the data
    /// backend separately so tests can inspect the raw bytes.
    pub(crate) fn shared_in_memory(
        initial: Index,
    ) -> (Arc<HandlerShared>, Arc<InMemoryBackend>) {
        let data = Arc::new(InMemoryBackend::new());
        let files = StoreFiles {
            data: Arc::clone(&data) as Arc<dyn StorageBackend>,
            index: crate::index::IndexFile::new(Box::new(InMemoryBackend::new())),
            write_lock: Mutex::new(()),
        };
        let shared = Arc::new(HandlerShared::new(
            files,
            initial,
            Arc::new(crate::observer::NoopObserver),
        ));
        (shared, data)
    }
}
