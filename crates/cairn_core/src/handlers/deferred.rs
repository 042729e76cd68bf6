//! Shared machinery of the two queueing flush policies.
//!
//! Interval and manual flushing differ only in who calls
//! [`DeferredCore::flush_batch`]; everything else - the pending set,
//! the queue, the batch commit sequence - lives here.

use super::HandlerShared;
use crate::error::CairnResult;
use crate::index::{DataProperties, DataReference, IndexRecord};
use crate::observer::FlushKind;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub(crate) struct QueuedRecord {
    key: String,
    payload: Bytes,
    properties: DataProperties,
}

/// Queueing state over the shared handler state.
///
/// A record added under a deferred policy lives in two places until it
/// is committed: `queue` preserves arrival order for the appender, and
/// `pending` serves reads of not-yet-flushed keys. The booking
/// placeholder in `shared.records` stays `None` the whole time, so the
/// key is already reserved against duplicates.
pub(crate) struct DeferredCore {
    pub(crate) shared: Arc<HandlerShared>,
    pending: DashMap<String, (Bytes, DataProperties)>,
    queue: Mutex<VecDeque<QueuedRecord>>,
}

impl DeferredCore {
    pub(crate) fn new(shared: Arc<HandlerShared>) -> Self {
        Self {
            shared,
            pending: DashMap::new(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Queues a transformed payload for the next flush.
    pub(crate) fn enqueue(&self, key: &str, payload: Bytes, properties: DataProperties) {
        self.pending
            .insert(key.to_string(), (payload.clone(), properties));
        self.queue.lock().push_back(QueuedRecord {
            key: key.to_string(),
            payload,
            properties,
        });
    }

    /// Serves a read from the pending set or the data file.
    pub(crate) fn get_record(&self, key: &str) -> CairnResult<Option<(Bytes, DataProperties)>> {
        if let Some(entry) = self.pending.get(key) {
            let (payload, properties) = entry.value();
            return Ok(Some((payload.clone(), *properties)));
        }

        let Some(record) = self.shared.committed_record(key) else {
            return Ok(None);
        };
        let payload = self.shared.read_payload(&record)?;
        Ok(Some((payload, record.properties)))
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.shared.records.contains_key(key) || self.pending.contains_key(key)
    }

    /// Commits all currently queued records as one batch: appends in
    /// arrival order, syncs the data file once, rewrites the index
    /// snapshot once.
    ///
    /// An [`Auto`](FlushKind::Auto) flush with nothing queued is a
    /// no-op; a [`Manual`](FlushKind::Manual) one still syncs the files
    /// so the caller gets a durability barrier either way.
    pub(crate) fn flush_batch(&self, kind: FlushKind) -> CairnResult<()> {
        let batch: Vec<QueuedRecord> = {
            let mut queue = self.queue.lock();
            queue.drain(..).collect()
        };
        if batch.is_empty() && kind == FlushKind::Auto {
            return Ok(());
        }

        let files = &self.shared.files;
        let _commit = files.write_lock.lock();

        for record in &batch {
            let stream_start = files.data.append(&record.payload)?;
            self.shared.records.insert(
                record.key.clone(),
                Some(IndexRecord::new(
                    DataReference {
                        stream_start,
                        length: record.payload.len() as u64,
                    },
                    record.properties,
                )),
            );
        }

        files.data.flush()?;
        files.data.sync()?;
        files.index.save(&self.shared.snapshot_index())?;

        // Only now stop serving these keys from memory; the committed
        // records are readable from the file.
        for record in &batch {
            self.pending.remove(&record.key);
        }

        self.shared.observer.on_flush(kind);
        Ok(())
    }
}
