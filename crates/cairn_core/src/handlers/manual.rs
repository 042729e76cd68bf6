//! Explicit flush policy.

use super::deferred::DeferredCore;
use super::FlushHandler;
use crate::error::CairnResult;
use crate::index::DataProperties;
use crate::observer::FlushKind;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Queues adds and commits them only when the caller flushes.
///
/// Disposing performs a final drain so nothing queued is lost on a
/// clean close.
pub(crate) struct ManualFlushHandler {
    core: Arc<DeferredCore>,
    disposed: AtomicBool,
}

impl ManualFlushHandler {
    pub(crate) fn new(core: Arc<DeferredCore>) -> Self {
        Self {
            core,
            disposed: AtomicBool::new(false),
        }
    }
}

impl FlushHandler for ManualFlushHandler {
    fn ensure_and_book_key(&self, key: &str) -> CairnResult<()> {
        self.core.shared.book_key(key)
    }

    fn release_booking(&self, key: &str) {
        self.core.shared.release_booking(key);
    }

    fn add(&self, key: &str, payload: Bytes, properties: DataProperties) -> CairnResult<()> {
        self.core.enqueue(key, payload, properties);
        Ok(())
    }

    fn get_record(&self, key: &str) -> CairnResult<Option<(Bytes, DataProperties)>> {
        self.core.get_record(key)
    }

    fn contains(&self, key: &str) -> CairnResult<bool> {
        Ok(self.core.contains(key))
    }

    fn flush(&self) -> CairnResult<()> {
        self.core.flush_batch(FlushKind::Manual)
    }

    fn dispose(&self) -> CairnResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.core.flush_batch(FlushKind::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::shared_in_memory;
    use crate::index::Index;

    fn handler() -> ManualFlushHandler {
        let (shared, _) = shared_in_memory(Index::default());
        ManualFlushHandler::new(Arc::new(DeferredCore::new(shared)))
    }

    #[test]
    fn nothing_commits_until_flush() {
        let handler = handler();

        handler.ensure_and_book_key("k").unwrap();
        handler
            .add("k", Bytes::from_static(b"payload"), DataProperties::default())
            .unwrap();

        assert!(handler.core.shared.committed_record("k").is_none());
        // Still readable from the pending set.
        assert!(handler.get_record("k").unwrap().is_some());

        handler.flush().unwrap();
        assert!(handler.core.shared.committed_record("k").is_some());
    }

    #[test]
    fn dispose_commits_queued_records() {
        let handler = handler();

        handler.ensure_and_book_key("k").unwrap();
        handler
            .add("k", Bytes::from_static(b"payload"), DataProperties::default())
            .unwrap();
        handler.dispose().unwrap();

        assert!(handler.core.shared.committed_record("k").is_some());
    }

    #[test]
    fn flush_on_empty_queue_is_ok() {
        let handler = handler();
        handler.flush().unwrap();
        handler.flush().unwrap();
    }
}
