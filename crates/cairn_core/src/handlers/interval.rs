//! Background interval flush policy.

use super::deferred::DeferredCore;
use super::FlushHandler;
use crate::config::FlushMode;
use crate::error::{CairnError, CairnResult};
use crate::index::DataProperties;
use crate::observer::FlushKind;
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Signals the worker to wind down without waiting out a full sleep.
#[derive(Default)]
struct Shutdown {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Shutdown {
    /// Sleeps for `interval` unless shutdown is (or becomes) requested.
    /// Returns whether the worker should exit after its next pass.
    fn sleep(&self, interval: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.wake.wait_for(&mut stopped, interval);
        }
        *stopped
    }

    fn request(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }
}

/// Queues adds and commits them from a dedicated worker thread on a
/// fixed interval.
///
/// Explicit flushing is not supported in this mode; the worker is the
/// only committer. Disposing requests shutdown, and the worker performs
/// one final drain before exiting, so the join doubles as the
/// everything-is-durable signal.
pub(crate) struct IntervalFlushHandler {
    core: Arc<DeferredCore>,
    interval: Duration,
    shutdown: Arc<Shutdown>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalFlushHandler {
    pub(crate) fn new(core: Arc<DeferredCore>, interval: Duration) -> Self {
        Self {
            core,
            interval,
            shutdown: Arc::new(Shutdown::default()),
            worker: Mutex::new(None),
        }
    }
}

impl FlushHandler for IntervalFlushHandler {
    fn init(&self) -> CairnResult<()> {
        let core = Arc::clone(&self.core);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        let handle = std::thread::Builder::new()
            .name("cairn-flush".to_string())
            .spawn(move || loop {
                let exiting = shutdown.sleep(interval);
                if let Err(err) = core.flush_batch(FlushKind::Auto) {
                    tracing::error!(error = %err, "background flush failed");
                }
                if exiting {
                    break;
                }
            })?;

        *self.worker.lock() = Some(handle);
        Ok(())
    }

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
        Err(CairnError::FlushNotSupported {
            mode: FlushMode::Deferred {
                interval: self.interval,
            }
            .name(),
        })
    }

    fn dispose(&self) -> CairnResult<()> {
        if let Some(handle) = self.worker.lock().take() {
            self.shutdown.request();
            if handle.join().is_ok() {
                // The worker's final drain committed everything.
                return Ok(());
            }
            tracing::error!("flush worker panicked during shutdown");
        }

        // No worker to rely on; drain whatever is still queued.
        self.core.flush_batch(FlushKind::Auto)
    }
}
