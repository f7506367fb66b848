use tokio::task::AbortHandle;
use tracing::error;

use crate::error::IngestResult;
use crate::workers::base::WorkerHandle;
use crate::workers::consumer::ConsumerWorkerHandle;

/// Set of running consumer workers sharing the same job queue.
#[derive(Debug, Default)]
pub struct ConsumerWorkerPool {
    handles: Vec<ConsumerWorkerHandle>,
}

impl ConsumerWorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: ConsumerWorkerHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns handles able to abort every worker, even after the pool was consumed by
    /// [`ConsumerWorkerPool::wait_all`].
    pub fn abort_handles(&self) -> Vec<AbortHandle> {
        self.handles
            .iter()
            .map(ConsumerWorkerHandle::abort_handle)
            .collect()
    }

    /// Waits for every worker to exit.
    ///
    /// All workers are awaited even when some of them fail; the failures are aggregated into a
    /// single error.
    pub async fn wait_all(self) -> IngestResult<()> {
        let mut errors = Vec::new();

        for handle in self.handles {
            let worker_id = handle.worker_id();
            if let Err(err) = handle.wait().await {
                error!(worker_id, error = %err, "consumer worker completed with error");
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}
