use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;

use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::source::{CommitSource, EventSource};
use crate::test_utils::notify::TimedNotify;
use crate::types::{CommitStats, EventBatch, EventsCursor};

/// Notifiers waiting for a call counter to reach a threshold.
#[derive(Debug, Default)]
struct CountConditions(Vec<(usize, Arc<Notify>)>);

impl CountConditions {
    fn register(&mut self, current: usize, target: usize) -> TimedNotify {
        let notify = Arc::new(Notify::new());
        if current >= target {
            notify.notify_one();
        } else {
            self.0.push((target, notify.clone()));
        }

        TimedNotify::new(notify)
    }

    fn check(&mut self, current: usize) {
        self.0.retain(|(target, notify)| {
            let reached = current >= *target;
            if reached {
                notify.notify_one();
            }

            !reached
        });
    }
}

#[derive(Debug, Default)]
struct EventSourceInner {
    script: VecDeque<IngestResult<EventBatch>>,
    cursors: Vec<EventsCursor>,
    conditions: CountConditions,
}

/// [`EventSource`] answering with scripted results, in order.
///
/// Once the script is exhausted every call answers "unchanged" with the cursor it was given.
/// Every cursor received is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEventSource {
    inner: Arc<Mutex<EventSourceInner>>,
}

impl ScriptedEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source answering with `batches`, in order.
    pub fn with_batches(batches: impl IntoIterator<Item = EventBatch>) -> Self {
        let inner = EventSourceInner {
            script: batches.into_iter().map(Ok).collect(),
            ..Default::default()
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub async fn push_batch(&self, batch: EventBatch) {
        self.inner.lock().await.script.push_back(Ok(batch));
    }

    pub async fn push_error(&self, kind: ErrorKind) {
        let error = ingest_error!(kind, "Scripted event source failure");
        self.inner.lock().await.script.push_back(Err(error));
    }

    /// Cursors received so far, one per call.
    pub async fn cursors(&self) -> Vec<EventsCursor> {
        self.inner.lock().await.cursors.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.inner.lock().await.cursors.len()
    }

    /// Returns a notification fired once `count` fetches were made.
    pub async fn wait_for_fetches(&self, count: usize) -> TimedNotify {
        let mut inner = self.inner.lock().await;
        let current = inner.cursors.len();

        inner.conditions.register(current, count)
    }
}

impl EventSource for ScriptedEventSource {
    async fn fetch_events(&self, cursor: &EventsCursor) -> IngestResult<EventBatch> {
        let mut inner = self.inner.lock().await;

        inner.cursors.push(cursor.clone());
        let result = inner
            .script
            .pop_front()
            .unwrap_or_else(|| Ok(EventBatch::unchanged(cursor.clone())));

        let count = inner.cursors.len();
        inner.conditions.check(count);

        result
    }
}

#[derive(Debug, Default)]
struct CommitSourceInner {
    commits: HashMap<String, IngestResult<CommitStats>>,
    calls: Vec<String>,
    conditions: CountConditions,
}

/// [`CommitSource`] answering from a map keyed by commit reference.
///
/// Unknown references fail with [`ErrorKind::SourceNotFound`]. Every requested reference is
/// recorded in call order, before the optional delay is applied.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommitSource {
    inner: Arc<Mutex<CommitSourceInner>>,
    delay: Option<Duration>,
}

impl ScriptedCommitSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn add_commit(&self, reference: &str, stats: CommitStats) {
        self.inner
            .lock()
            .await
            .commits
            .insert(reference.to_owned(), Ok(stats));
    }

    pub async fn add_failure(&self, reference: &str, kind: ErrorKind) {
        let error = ingest_error!(kind, "Scripted commit source failure");
        self.inner
            .lock()
            .await
            .commits
            .insert(reference.to_owned(), Err(error));
    }

    /// References requested so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    /// Returns a notification fired once `count` calls were made.
    pub async fn wait_for_calls(&self, count: usize) -> TimedNotify {
        let mut inner = self.inner.lock().await;
        let current = inner.calls.len();

        inner.conditions.register(current, count)
    }
}

impl CommitSource for ScriptedCommitSource {
    async fn get_commit_stats(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> IngestResult<CommitStats> {
        let result = {
            let mut inner = self.inner.lock().await;

            inner.calls.push(reference.to_owned());
            let count = inner.calls.len();
            inner.conditions.check(count);

            inner.commits.get(reference).cloned().unwrap_or_else(|| {
                Err(ingest_error!(
                    ErrorKind::SourceNotFound,
                    "Commit not found",
                    format!("{owner}/{repo}@{reference}")
                ))
            })
        };

        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        result
    }
}
