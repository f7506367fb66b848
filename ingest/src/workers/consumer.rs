use tokio::task::{AbortHandle, JoinHandle};
use tracing::{Instrument, Span, debug, info, warn};

use crate::concurrency::queue::JobReceiver;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, IngestError, IngestResult};
use crate::ingest_error;
use crate::source::CommitSource;
use crate::store::StatsStore;
use crate::types::{CommitJob, CommitStatsRow};
use crate::workers::base::{Worker, WorkerHandle};

/// Handle to a running consumer worker.
#[derive(Debug)]
pub struct ConsumerWorkerHandle {
    worker_id: u16,
    handle: JoinHandle<IngestResult<()>>,
}

impl ConsumerWorkerHandle {
    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }
}

impl WorkerHandle<()> for ConsumerWorkerHandle {
    async fn wait(self) -> IngestResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => {
                debug!(worker_id = self.worker_id, "consumer worker was cancelled");

                Ok(())
            }
            Err(err) => Err(ingest_error!(
                ErrorKind::ConsumerWorkerPanic,
                "Consumer worker panicked",
                format!("worker {}: {err}", self.worker_id)
            )),
        }
    }
}

/// Worker resolving commit jobs into statistics and storing them.
///
/// Each job is attempted exactly once. A commit that cannot be found is skipped silently, any
/// other failure is logged and the job is dropped.
#[derive(Debug)]
pub struct ConsumerWorker<C, S> {
    worker_id: u16,
    commit_source: C,
    store: S,
    job_rx: JobReceiver,
    shutdown_rx: ShutdownRx,
    span: Span,
}

impl<C, S> ConsumerWorker<C, S> {
    /// Creates a consumer that logs inside `span`.
    pub fn new(
        worker_id: u16,
        commit_source: C,
        store: S,
        job_rx: JobReceiver,
        shutdown_rx: ShutdownRx,
        span: Span,
    ) -> Self {
        Self {
            worker_id,
            commit_source,
            store,
            job_rx,
            shutdown_rx,
            span,
        }
    }
}

impl<C, S> Worker<ConsumerWorkerHandle> for ConsumerWorker<C, S>
where
    C: CommitSource + Send + Sync + 'static,
    S: StatsStore + Send + Sync + 'static,
{
    type Error = IngestError;

    async fn start(self) -> IngestResult<ConsumerWorkerHandle> {
        let worker_id = self.worker_id;
        let span = self.span.clone();
        let handle = tokio::spawn(self.run().instrument(span));

        Ok(ConsumerWorkerHandle { worker_id, handle })
    }
}

impl<C, S> ConsumerWorker<C, S>
where
    C: CommitSource + Send + Sync + 'static,
    S: StatsStore + Send + Sync + 'static,
{
    async fn run(mut self) -> IngestResult<()> {
        debug!("starting consumer worker");

        let mut processed = 0u64;

        loop {
            if self.shutdown_rx.is_shutdown() {
                // Only jobs already buffered are handled, the producer no longer enqueues.
                while let Some(job) = self.job_rx.try_recv().await {
                    self.process(job).await;
                    processed += 1;
                }

                break;
            }

            let next = tokio::select! {
                biased;

                _ = self.shutdown_rx.signaled() => None,
                job = self.job_rx.recv() => Some(job),
            };

            // Shutdown was signaled, the next iteration drains what is left.
            let Some(job) = next else {
                continue;
            };

            let Some(job) = job else {
                debug!("job queue closed and drained");
                break;
            };

            self.process(job).await;
            processed += 1;
        }

        info!(processed, "consumer worker stopped");

        Ok(())
    }

    async fn process(&self, job: CommitJob) {
        let stats = match self
            .commit_source
            .get_commit_stats(&job.owner, &job.repo, &job.reference)
            .await
        {
            Ok(stats) => stats,
            Err(err) if err.kind() == ErrorKind::SourceNotFound => {
                debug!(
                    event_id = %job.event_id,
                    repo_name = %job.repo_name(),
                    reference = %job.reference,
                    "commit not found, skipping"
                );

                return;
            }
            Err(err) => {
                warn!(
                    event_id = %job.event_id,
                    repo_name = %job.repo_name(),
                    reference = %job.reference,
                    error = %err,
                    "failed to fetch commit stats, dropping job"
                );

                return;
            }
        };

        let row = CommitStatsRow::new(&job, stats);
        match self.store.insert_commit_stats(&row).await {
            Ok(true) => {
                debug!(
                    sha = %row.sha,
                    repo_name = %row.repo_name,
                    net = row.net,
                    "commit stats saved"
                );
            }
            Ok(false) => {
                debug!(sha = %row.sha, "commit stats already recorded");
            }
            Err(err) => {
                warn!(sha = %row.sha, error = %err, "failed to store commit stats, dropping job");
            }
        }
    }
}
