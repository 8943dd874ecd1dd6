//! Per-thread concurrency control.
//!
//! Each `thread_id` is a logical serial execution: at most one graph
//! turn per thread may be in flight. Different threads run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use wd_domain::error::{Error, Result};

/// Maps each thread id to a single-permit semaphore. Holding the permit
/// is holding the thread's turn lock; it releases on drop.
pub struct ThreadLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for ThreadLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the turn lock for a thread, waiting behind any in-flight
    /// turn.
    pub async fn acquire(&self, thread_id: &str) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(thread_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned()
            .await
            .map_err(|_| Error::Other(format!("turn lock for '{thread_id}' was closed")))
    }

    /// Number of tracked threads (for monitoring).
    pub fn thread_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop lock entries for threads with no turn in flight.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}
