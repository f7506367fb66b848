//! Orchestration of the producer, the job queue and the consumer workers.

use std::sync::Arc;

use config::shared::PipelineConfig;
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::{Span, info, info_span, warn};

use crate::bail;
use crate::concurrency::queue::{JobReceiver, create_job_queue};
use crate::concurrency::shutdown::ShutdownTx;
use crate::error::{ErrorKind, IngestResult};
use crate::source::{CommitSource, EventSource};
use crate::store::StatsStore;
use crate::workers::base::{Worker, WorkerHandle, WorkerType};
use crate::workers::consumer::ConsumerWorker;
use crate::workers::pool::ConsumerWorkerPool;
use crate::workers::producer::{ProducerWorker, ProducerWorkerHandle};

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started {
        producer: ProducerWorkerHandle,
        pool: ConsumerWorkerPool,
        job_rx: JobReceiver,
    },
}

/// Ingestion pipeline: one producer feeding a bounded queue drained by a pool of consumers.
///
/// Stopping follows a strict order. Shutdown is signaled, the producer is awaited and hands back
/// the queue sender, the queue is closed with it, and only then are the consumers awaited while
/// they drain what is still buffered.
#[derive(Debug)]
pub struct Pipeline<E, C, S> {
    config: Arc<PipelineConfig>,
    event_source: E,
    commit_source: C,
    store: S,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
    span: Span,
}

impl<E, C, S> Pipeline<E, C, S>
where
    E: EventSource + Clone + Send + Sync + 'static,
    C: CommitSource + Clone + Send + Sync + 'static,
    S: StatsStore + Clone + Send + Sync + 'static,
{
    pub fn new(
        config: PipelineConfig,
        event_source: E,
        commit_source: C,
        store: S,
        shutdown_tx: ShutdownTx,
    ) -> Self {
        Self {
            config: Arc::new(config),
            event_source,
            commit_source,
            store,
            state: PipelineState::NotStarted,
            shutdown_tx,
            span: info_span!("pipeline"),
        }
    }

    /// Sets the span every worker span is parented to.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Spawns the producer and the consumer workers.
    ///
    /// Calling it on an already started pipeline does nothing.
    pub async fn start(&mut self) -> IngestResult<()> {
        if matches!(self.state, PipelineState::Started { .. }) {
            warn!("pipeline already started");

            return Ok(());
        }

        info!(
            max_workers = self.config.max_workers,
            queue_capacity = self.config.queue_capacity,
            poll_interval_ms = self.config.poll_interval_ms,
            "starting pipeline"
        );

        let (job_tx, job_rx) = create_job_queue(self.config.queue_capacity);

        let mut pool = ConsumerWorkerPool::new();
        for worker_id in 0..self.config.max_workers {
            let worker_type = WorkerType::Consumer { worker_id };
            let span = info_span!(parent: &self.span, "consumer", %worker_type, worker_id);

            let handle = ConsumerWorker::new(
                worker_id,
                self.commit_source.clone(),
                self.store.clone(),
                job_rx.clone(),
                self.shutdown_tx.subscribe(),
                span,
            )
            .start()
            .await?;

            pool.add(handle);
        }

        let worker_type = WorkerType::Producer;
        let producer = ProducerWorker::new(
            self.config.clone(),
            self.event_source.clone(),
            self.store.clone(),
            job_tx,
            self.shutdown_tx.subscribe(),
            info_span!(parent: &self.span, "producer", %worker_type),
        )
        .start()
        .await?;

        self.state = PipelineState::Started {
            producer,
            pool,
            job_rx,
        };

        Ok(())
    }

    /// Waits for the producer and every consumer to exit.
    ///
    /// Without a prior [`Pipeline::shutdown`] this only returns if the producer fails.
    pub async fn wait(self) -> IngestResult<()> {
        let PipelineState::Started {
            producer,
            pool,
            job_rx,
        } = self.state
        else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(());
        };

        let mut errors = vec![];

        info!("waiting for producer to stop");

        match producer.wait().await {
            Ok(job_tx) => {
                job_tx.close();

                info!("producer stopped, job queue closed");
            }
            Err(err) => {
                // The sender was dropped with the producer task, so the queue is closed already.
                errors.push(err);
                self.shutdown_tx.shutdown();

                info!("producer failed, shutting down consumer workers");
            }
        }

        info!(workers = pool.len(), "waiting for consumer workers to drain the queue");

        if let Err(err) = pool.wait_all().await {
            let errors_number = err.kinds().len();
            errors.push(err);

            info!(errors_number, "consumer workers failed with an error");
        }

        let dropped = job_rx.drain().await.len();
        if dropped > 0 {
            warn!(dropped_jobs = dropped, "jobs left in the queue after shutdown were dropped");
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        info!("pipeline stopped");

        Ok(())
    }

    /// Signals every worker to stop. Does not wait for them.
    pub fn shutdown(&self) {
        info!("shutting down pipeline");

        self.shutdown_tx.shutdown();
    }

    /// Signals shutdown and waits for the pipeline to stop within the configured grace period.
    ///
    /// Workers still running when the grace period elapses are aborted, the jobs still buffered
    /// are counted as dropped and [`ErrorKind::ShutdownTimeout`] is returned.
    pub async fn shutdown_and_wait(self) -> IngestResult<()> {
        self.shutdown();

        let grace_period = self.config.shutdown_grace_period();
        let abort_handles = self.abort_handles();
        let job_rx = match &self.state {
            PipelineState::NotStarted => None,
            PipelineState::Started { job_rx, .. } => Some(job_rx.clone()),
        };

        match timeout(grace_period, self.wait()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    grace_period_ms = grace_period.as_millis() as u64,
                    "pipeline did not stop within the grace period, aborting workers"
                );

                for abort_handle in abort_handles {
                    abort_handle.abort();
                }

                let dropped = match job_rx {
                    Some(job_rx) => job_rx.drain().await.len(),
                    None => 0,
                };
                if dropped > 0 {
                    warn!(
                        dropped_jobs = dropped,
                        "jobs left in the queue after shutdown were dropped"
                    );
                }

                bail!(
                    ErrorKind::ShutdownTimeout,
                    "Pipeline did not stop within the grace period",
                    format!(
                        "grace period of {grace_period:?} elapsed, {dropped} buffered jobs dropped"
                    )
                );
            }
        }
    }

    fn abort_handles(&self) -> Vec<AbortHandle> {
        match &self.state {
            PipelineState::NotStarted => Vec::new(),
            PipelineState::Started { producer, pool, .. } => {
                let mut handles = pool.abort_handles();
                handles.push(producer.abort_handle());

                handles
            }
        }
    }
}
