//! Bounded job queue between the producer and the consumer workers.
//!
//! The queue has a single sending side, [`JobSender`], which is not [`Clone`]: whoever owns it is
//! the only one able to enqueue, and closing the queue consumes it. Receiving is shared by every
//! worker through cloned [`JobReceiver`]s.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::bail;
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, IngestResult};
use crate::types::CommitJob;

/// Creates a queue able to buffer at most `capacity` jobs.
///
/// # Panics
///
/// Panics if `capacity` is zero, which configuration validation rejects beforehand.
pub fn create_job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity);

    (
        JobSender { tx },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producing side of the job queue.
#[derive(Debug)]
pub struct JobSender {
    tx: mpsc::Sender<CommitJob>,
}

impl JobSender {
    /// Enqueues `job`, waiting for a free slot while the queue is full.
    ///
    /// Waiting is interrupted by shutdown, in which case the job is handed back in
    /// [`ShutdownResult::Shutdown`]. Shutdown takes precedence over a free slot, so nothing is
    /// enqueued once shutdown was requested.
    pub async fn send(
        &self,
        job: CommitJob,
        shutdown_rx: &mut ShutdownRx,
    ) -> IngestResult<ShutdownResult<(), CommitJob>> {
        tokio::select! {
            biased;

            _ = shutdown_rx.signaled() => Ok(ShutdownResult::Shutdown(job)),

            permit = self.tx.reserve() => {
                let Ok(permit) = permit else {
                    bail!(
                        ErrorKind::JobQueueClosed,
                        "Job queue has no receivers left",
                        format!("could not enqueue job for commit {}", job.reference)
                    );
                };

                permit.send(job);

                Ok(ShutdownResult::Ok(()))
            }
        }
    }

    /// Number of jobs that can be enqueued before [`JobSender::send`] starts waiting.
    pub fn available_capacity(&self) -> usize {
        self.tx.capacity()
    }

    /// Closes the queue.
    ///
    /// Workers keep receiving the jobs already buffered and then observe the end of the queue.
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Consuming side of the job queue, shared by all workers.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<CommitJob>>>,
}

impl JobReceiver {
    /// Waits for the next job.
    ///
    /// Returns [`None`] once the queue is closed and fully drained. Cancel safe.
    pub async fn recv(&self) -> Option<CommitJob> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Takes the next job only if one is already buffered.
    pub async fn try_recv(&self) -> Option<CommitJob> {
        let mut rx = self.rx.lock().await;
        rx.try_recv().ok()
    }

    /// Removes and returns every job still buffered.
    pub async fn drain(&self) -> Vec<CommitJob> {
        let mut rx = self.rx.lock().await;
        let mut jobs = Vec::new();
        while let Ok(job) = rx.try_recv() {
            jobs.push(job);
        }

        jobs
    }
}
