use std::sync::Arc;
use std::time::Duration;

use config::shared::PipelineConfig;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::sleep;
use tracing::{Instrument, Span, debug, info, warn};

use crate::concurrency::queue::JobSender;
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, IngestError, IngestResult};
use crate::ingest_error;
use crate::source::EventSource;
use crate::store::StatsStore;
use crate::types::{CommitJob, EventsCursor, PushEventRow, PushPayload, SourceEvent};
use crate::workers::base::{Worker, WorkerHandle};

/// Handle to the running producer.
///
/// Waiting on it yields the [`JobSender`] back, so that the queue can be closed only once the
/// producer has stopped writing to it.
#[derive(Debug)]
pub struct ProducerWorkerHandle {
    handle: JoinHandle<IngestResult<JobSender>>,
}

impl ProducerWorkerHandle {
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }
}

impl WorkerHandle<JobSender> for ProducerWorkerHandle {
    async fn wait(self) -> IngestResult<JobSender> {
        self.handle.await.map_err(|err| {
            if err.is_cancelled() {
                ingest_error!(
                    ErrorKind::ProducerWorkerPanic,
                    "Producer was cancelled",
                    err
                )
            } else {
                ingest_error!(ErrorKind::ProducerWorkerPanic, "Producer panicked", err)
            }
        })?
    }
}

/// Sequential loop polling the event source and fanning push events out into commit jobs.
///
/// Every push event is first recorded in the store. Only events recorded for the first time are
/// expanded into jobs, which is what keeps redelivered events from producing duplicate work.
#[derive(Debug)]
pub struct ProducerWorker<E, S> {
    config: Arc<PipelineConfig>,
    event_source: E,
    store: S,
    job_tx: JobSender,
    shutdown_rx: ShutdownRx,
    span: Span,
}

impl<E, S> ProducerWorker<E, S> {
    /// Creates a producer that logs inside `span`.
    pub fn new(
        config: Arc<PipelineConfig>,
        event_source: E,
        store: S,
        job_tx: JobSender,
        shutdown_rx: ShutdownRx,
        span: Span,
    ) -> Self {
        Self {
            config,
            event_source,
            store,
            job_tx,
            shutdown_rx,
            span,
        }
    }
}

impl<E, S> Worker<ProducerWorkerHandle> for ProducerWorker<E, S>
where
    E: EventSource + Send + Sync + 'static,
    S: StatsStore + Send + Sync + 'static,
{
    type Error = IngestError;

    async fn start(self) -> IngestResult<ProducerWorkerHandle> {
        let span = self.span.clone();
        let handle = tokio::spawn(self.run().instrument(span));

        Ok(ProducerWorkerHandle { handle })
    }
}

impl<E, S> ProducerWorker<E, S>
where
    E: EventSource + Send + Sync + 'static,
    S: StatsStore + Send + Sync + 'static,
{
    async fn run(mut self) -> IngestResult<JobSender> {
        info!("starting producer");

        let mut cursor = EventsCursor::default();

        loop {
            if self.shutdown_rx.is_shutdown() {
                break;
            }

            let batch = match self.event_source.fetch_events(&cursor).await {
                Ok(batch) => batch,
                Err(err) => {
                    warn!(error = %err, "failed to fetch events");

                    let delay = self.config.fetch_error_delay();
                    if self.sleep_unless_shutdown(delay).await.should_shutdown() {
                        break;
                    }

                    continue;
                }
            };

            cursor = batch.cursor;

            let push_events: Vec<&SourceEvent> =
                batch.events.iter().filter(|event| event.is_push()).collect();
            info!(
                count = batch.events.len(),
                push_count = push_events.len(),
                "events fetched"
            );

            let mut interrupted = false;
            for event in push_events {
                if self.process_event(event).await?.should_shutdown() {
                    interrupted = true;
                    break;
                }
            }

            if interrupted {
                break;
            }

            let poll_interval = self.config.poll_interval();
            if self.sleep_unless_shutdown(poll_interval).await.should_shutdown() {
                break;
            }
        }

        info!("shutdown requested, producer stopped");

        Ok(self.job_tx)
    }

    /// Records `event` and enqueues one job per commit it references.
    ///
    /// Failures of this single event are logged and swallowed. Only a closed queue is returned as
    /// an error, since no further event could be processed.
    async fn process_event(&mut self, event: &SourceEvent) -> IngestResult<ShutdownResult<(), ()>> {
        if self.shutdown_rx.is_shutdown() {
            return Ok(ShutdownResult::Shutdown(()));
        }

        let row = PushEventRow::from(event);
        match self.store.insert_push_event(&row).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(event_id = %event.id, "push event already recorded, skipping");

                return Ok(ShutdownResult::Ok(()));
            }
            Err(err) => {
                warn!(event_id = %event.id, error = %err, "failed to record push event, skipping");

                return Ok(ShutdownResult::Ok(()));
            }
        }

        let payload = match PushPayload::parse(&event.payload) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(event_id = %event.id, error = %err, "malformed push payload, skipping");

                return Ok(ShutdownResult::Ok(()));
            }
        };

        let Some((owner, repo)) = event.owner_and_repo() else {
            warn!(
                event_id = %event.id,
                repo_name = ?event.repo_name,
                "push event has no owner/repo name, skipping fan-out"
            );

            return Ok(ShutdownResult::Ok(()));
        };

        let references = payload.commit_references();
        let jobs_count = references.len();

        for (index, reference) in references.into_iter().enumerate() {
            let job = CommitJob {
                event_id: event.id.clone(),
                owner: owner.to_owned(),
                repo: repo.to_owned(),
                reference: reference.to_owned(),
            };

            if self
                .job_tx
                .send(job, &mut self.shutdown_rx)
                .await?
                .should_shutdown()
            {
                info!(
                    event_id = %event.id,
                    dropped_jobs = jobs_count - index,
                    "shutdown requested during fan-out, dropping remaining jobs"
                );

                return Ok(ShutdownResult::Shutdown(()));
            }
        }

        info!(
            event_id = %event.id,
            repo_name = %event.repo_name.as_deref().unwrap_or_default(),
            jobs = jobs_count,
            "push event processed"
        );

        Ok(ShutdownResult::Ok(()))
    }

    async fn sleep_unless_shutdown(&mut self, duration: Duration) -> ShutdownResult<(), ()> {
        tokio::select! {
            biased;

            _ = self.shutdown_rx.signaled() => ShutdownResult::Shutdown(()),
            _ = sleep(duration) => ShutdownResult::Ok(()),
        }
    }
}
