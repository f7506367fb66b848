use std::fmt;
use std::future::Future;

use crate::error::IngestResult;

/// Classification of pipeline workers, used to label their spans and errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerType {
    /// Worker polling events and enqueueing commit jobs.
    Producer,
    /// Worker resolving commit jobs taken from the queue.
    Consumer {
        /// Index of the worker inside the pool.
        worker_id: u16,
    },
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerType::Producer => write!(f, "producer"),
            WorkerType::Consumer { .. } => write!(f, "consumer"),
        }
    }
}

/// A background worker that can be started once.
///
/// `H` is the handle returned when the worker starts.
pub trait Worker<H> {
    /// Error type returned when startup fails.
    type Error;

    /// Spawns the worker and returns a handle to it without waiting for its completion.
    fn start(self) -> impl Future<Output = Result<H, Self::Error>> + Send;
}

/// Handle to a running worker.
///
/// `T` is the value the worker hands back once it completes.
pub trait WorkerHandle<T> {
    /// Waits for the worker to complete, consuming the handle.
    fn wait(self) -> impl Future<Output = IngestResult<T>> + Send;
}
