//! Synchronous commit-per-add flush policy.

use super::{FlushHandler, HandlerShared};
use crate::error::CairnResult;
use crate::index::{DataProperties, DataReference, IndexRecord};
use crate::observer::FlushKind;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Commits every record synchronously: when `add` returns, the payload
/// is synced to disk and the index snapshot on disk includes it.
pub(crate) struct AtOnceHandler {
    shared: Arc<HandlerShared>,
    disposed: AtomicBool,
}

impl AtOnceHandler {
    pub(crate) fn new(shared: Arc<HandlerShared>) -> Self {
        Self {
            shared,
            disposed: AtomicBool::new(false),
        }
    }

    fn commit_files(&self, kind: FlushKind) -> CairnResult<()> {
        let files = &self.shared.files;
        files.data.flush()?;
        files.data.sync()?;
        files.index.save(&self.shared.snapshot_index())?;
        self.shared.observer.on_flush(kind);
        Ok(())
    }
}

impl FlushHandler for AtOnceHandler {
    fn ensure_and_book_key(&self, key: &str) -> CairnResult<()> {
        self.shared.book_key(key)
    }

    fn release_booking(&self, key: &str) {
        self.shared.release_booking(key);
    }

    fn add(&self, key: &str, payload: Bytes, properties: DataProperties) -> CairnResult<()> {
        let files = &self.shared.files;
        let _commit = files.write_lock.lock();

        let stream_start = files.data.append(&payload)?;
        let record = IndexRecord::new(
            DataReference {
                stream_start,
                length: payload.len() as u64,
            },
            properties,
        );
        self.shared.records.insert(key.to_string(), Some(record));

        self.commit_files(FlushKind::Auto)
    }

    fn get_record(&self, key: &str) -> CairnResult<Option<(Bytes, DataProperties)>> {
        let Some(record) = self.shared.committed_record(key) else {
            return Ok(None);
        };
        let payload = self.shared.read_payload(&record)?;
        Ok(Some((payload, record.properties)))
    }

    fn contains(&self, key: &str) -> CairnResult<bool> {
        Ok(self.shared.records.contains_key(key))
    }

    /// Nothing is ever pending; re-syncs the files anyway so a flush
    /// call is a durability barrier in every mode.
    fn flush(&self) -> CairnResult<()> {
        let _commit = self.shared.files.write_lock.lock();
        self.commit_files(FlushKind::Manual)
    }

    fn dispose(&self) -> CairnResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _commit = self.shared.files.write_lock.lock();
        self.commit_files(FlushKind::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::shared_in_memory;
    use crate::index::Index;

    #[test]
    fn add_is_immediately_committed() {
        let (shared, data) = shared_in_memory(Index::default());
        let handler = AtOnceHandler::new(shared);

        handler.ensure_and_book_key("k").unwrap();
        handler
            .add("k", Bytes::from_static(b"payload"), DataProperties::default())
            .unwrap();

        assert_eq!(data.data(), b"payload");
        let (payload, props) = handler.get_record("k").unwrap().unwrap();
        assert_eq!(payload.as_ref(), b"payload");
        assert_eq!(props, DataProperties::default());
    }

    #[test]
    fn duplicate_booking_is_rejected() {
        let (shared, _) = shared_in_memory(Index::default());
        let handler = AtOnceHandler::new(shared);

        handler.ensure_and_book_key("k").unwrap();
        assert!(handler.ensure_and_book_key("k").is_err());
    }

    #[test]
    fn released_booking_can_be_rebooked() {
        let (shared, _) = shared_in_memory(Index::default());
        let handler = AtOnceHandler::new(shared);

        handler.ensure_and_book_key("k").unwrap();
        handler.release_booking("k");
        handler.ensure_and_book_key("k").unwrap();
    }

    #[test]
    fn booked_key_contains_but_not_readable() {
        let (shared, _) = shared_in_memory(Index::default());
        let handler = AtOnceHandler::new(shared);

        handler.ensure_and_book_key("k").unwrap();
        assert!(handler.contains("k").unwrap());
        assert!(handler.get_record("k").unwrap().is_none());
    }

    #[test]
    fn consecutive_adds_are_contiguous() {
        let (shared, data) = shared_in_memory(Index::default());
        let handler = AtOnceHandler::new(Arc::clone(&shared));

        for (key, payload) in [("a", "one"), ("b", "two2"), ("c", "three")] {
            handler.ensure_and_book_key(key).unwrap();
            handler
                .add(key, Bytes::from(payload), DataProperties::default())
                .unwrap();
        }

        let index = shared.snapshot_index();
        index.check_contiguous().unwrap();
        assert_eq!(index.expected_data_len(), data.data().len() as u64);
    }

    #[test]
    fn dispose_is_idempotent() {
        let (shared, _) = shared_in_memory(Index::default());
        let handler = AtOnceHandler::new(shared);

        handler.dispose().unwrap();
        handler.dispose().unwrap();
    }
}
