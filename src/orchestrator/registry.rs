//! In-memory registry of spawned evaluation tasks.
//!
//! Dispatch is fire-and-forget: nothing on the request path ever joins a
//! unit task. The registry exists so the spawned handles are observable —
//! tests (and shutdown diagnostics) can wait for a batch to settle without
//! changing the no-block dispatch contract.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Mutex<HashMap<String, Vec<JoinHandle<()>>>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a batch id for dispatch. Returns `false` if the batch already
    /// has registered tasks, which signals a duplicate dispatch.
    pub fn begin_batch(&self, batch_id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.contains_key(batch_id) {
            return false;
        }
        inner.insert(batch_id.to_string(), Vec::new());
        true
    }

    /// Records a spawned unit task under its batch.
    pub fn record(&self, batch_id: &str, handle: JoinHandle<()>) {
        self.inner
            .lock()
            .entry(batch_id.to_string())
            .or_default()
            .push(handle);
    }

    /// Number of tasks currently registered for a batch.
    pub fn task_count(&self, batch_id: &str) -> usize {
        self.inner.lock().get(batch_id).map_or(0, Vec::len)
    }

    /// Batch ids with registered tasks.
    pub fn active_batches(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Drains and awaits every task of a batch. Test observability only;
    /// the dispatch path never calls this.
    pub async fn join_batch(&self, batch_id: &str) {
        let handles = self.inner.lock().remove(batch_id).unwrap_or_default();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(batch_id, error = %e, "unit task panicked");
            }
        }
    }
}
