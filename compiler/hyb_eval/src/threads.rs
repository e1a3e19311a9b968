//! Script threads.
//!
//! Each threaded call runs on its own OS thread with its own interpreter.
//! The registry keeps join handles by the integer handle scripts see and
//! counts threads that have started and not yet finished.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use hyb_value::errors::internal;
use hyb_value::{EvalResult, ValueId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

/// What a script thread hands back: its held result, or the error that
/// ended it.
pub type ThreadOutcome = EvalResult<Option<ValueId>>;

/// Live and finished-but-unjoined script threads.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    running: Arc<AtomicUsize>,
    next_handle: AtomicU64,
    handles: Mutex<FxHashMap<u64, JoinHandle<ThreadOutcome>>>,
}

/// Decrements the running count when a thread body finishes, panics
/// included.
struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ThreadRegistry {
    pub fn new() -> Self {
        ThreadRegistry::default()
    }

    /// Start `body` on a new OS thread and return its handle.
    ///
    /// The thread counts as running from this call on, so a script that
    /// checks right after creating it sees it.
    pub fn spawn<F>(&self, label: &str, body: F) -> EvalResult<u64>
    where
        F: FnOnce() -> ThreadOutcome + Send + 'static,
    {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        self.running.fetch_add(1, Ordering::SeqCst);
        let guard = RunningGuard(Arc::clone(&self.running));
        let spawned = thread::Builder::new()
            .name(format!("hybris-{label}-{handle}"))
            .spawn(move || {
                let _running = guard;
                body()
            });
        match spawned {
            Ok(join) => {
                debug!(handle, function = label, "thread spawned");
                self.handles.lock().insert(handle, join);
                Ok(handle)
            }
            // The closure (and its guard) was dropped with the failed spawn.
            Err(err) => Err(internal(format!("could not spawn thread: {err}"))),
        }
    }

    /// Remove a thread's join handle.
    pub fn take(&self, handle: u64) -> Option<JoinHandle<ThreadOutcome>> {
        self.handles.lock().remove(&handle)
    }

    /// Join every thread not joined yet, in handle order.
    pub fn join_all(&self) -> Vec<(u64, thread::Result<ThreadOutcome>)> {
        let mut pending: Vec<(u64, JoinHandle<ThreadOutcome>)> =
            self.handles.lock().drain().collect();
        pending.sort_by_key(|(handle, _)| *handle);
        pending
            .into_iter()
            .map(|(handle, join)| (handle, join.join()))
            .collect()
    }

    /// Threads started and not yet finished.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}
