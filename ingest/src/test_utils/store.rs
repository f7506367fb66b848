use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::error::{ErrorKind, IngestResult};
use crate::store::{MemoryStore, StatsStore};
use crate::test_utils::notify::TimedNotify;
use crate::types::{CommitStatsRow, PushEventRow};
use crate::{bail, ingest_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreMethod {
    InsertPushEvent,
    InsertCommitStats,
    GlobalNetLines,
    EventsSeenCount,
    Ping,
}

#[derive(Debug, Default)]
struct Inner {
    failing_push_events: HashSet<String>,
    failing_commits: HashSet<String>,
    failing_methods: HashSet<StoreMethod>,
    push_event_calls: Vec<String>,
    commit_stats_calls: Vec<String>,
    push_event_conditions: Vec<(usize, Arc<Notify>)>,
    commit_stats_conditions: Vec<(usize, Arc<Notify>)>,
}

fn check_conditions(conditions: &mut Vec<(usize, Arc<Notify>)>, count: usize) {
    conditions.retain(|(target, notify)| {
        let reached = count >= *target;
        if reached {
            notify.notify_one();
        }

        !reached
    });
}

/// [`StatsStore`] over a [`MemoryStore`] that records calls, injects failures and notifies
/// waiters when row counts reach a threshold.
#[derive(Debug, Clone, Default)]
pub struct NotifyingStore {
    store: MemoryStore,
    inner: Arc<Mutex<Inner>>,
}

impl NotifyingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.store
    }

    /// Makes inserting the push event `event_id` fail.
    pub async fn fail_push_event(&self, event_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.failing_push_events.insert(event_id.to_owned());
    }

    /// Makes inserting statistics for `sha` fail.
    pub async fn fail_commit_stats(&self, sha: &str) {
        let mut inner = self.inner.lock().await;
        inner.failing_commits.insert(sha.to_owned());
    }

    /// Makes every call to `method` fail.
    pub async fn fail_method(&self, method: StoreMethod) {
        let mut inner = self.inner.lock().await;
        inner.failing_methods.insert(method);
    }

    /// Event ids passed to [`StatsStore::insert_push_event`], in call order.
    pub async fn push_event_calls(&self) -> Vec<String> {
        self.inner.lock().await.push_event_calls.clone()
    }

    /// Shas passed to [`StatsStore::insert_commit_stats`], in call order.
    pub async fn commit_stats_calls(&self) -> Vec<String> {
        self.inner.lock().await.commit_stats_calls.clone()
    }

    pub async fn push_events(&self) -> HashMap<String, PushEventRow> {
        self.store.push_events().await
    }

    pub async fn commit_stats(&self) -> HashMap<String, CommitStatsRow> {
        self.store.commit_stats().await
    }

    /// Returns a notification fired once `count` push events are stored.
    pub async fn notify_on_push_events(&self, count: usize) -> TimedNotify {
        let mut inner = self.inner.lock().await;
        let current = self.store.push_events().await.len();
        let notify = Arc::new(Notify::new());

        if current >= count {
            notify.notify_one();
        } else {
            inner.push_event_conditions.push((count, notify.clone()));
        }

        TimedNotify::new(notify)
    }

    /// Returns a notification fired once statistics for `count` commits are stored.
    pub async fn notify_on_commit_stats(&self, count: usize) -> TimedNotify {
        let mut inner = self.inner.lock().await;
        let current = self.store.commit_stats().await.len();
        let notify = Arc::new(Notify::new());

        if current >= count {
            notify.notify_one();
        } else {
            inner.commit_stats_conditions.push((count, notify.clone()));
        }

        TimedNotify::new(notify)
    }

    async fn check_method(&self, method: StoreMethod) -> IngestResult<()> {
        let inner = self.inner.lock().await;
        if inner.failing_methods.contains(&method) {
            bail!(
                ErrorKind::StoreQueryFailed,
                "Injected store failure",
                format!("{method:?}")
            );
        }

        Ok(())
    }
}

impl StatsStore for NotifyingStore {
    async fn insert_push_event(&self, row: &PushEventRow) -> IngestResult<bool> {
        // The lock is held across the insert so that count notifications are not missed.
        let mut inner = self.inner.lock().await;
        inner.push_event_calls.push(row.id.clone());

        if inner.failing_methods.contains(&StoreMethod::InsertPushEvent)
            || inner.failing_push_events.contains(&row.id)
        {
            return Err(ingest_error!(
                ErrorKind::StoreQueryFailed,
                "Injected store failure",
                format!("push event {}", row.id)
            ));
        }

        let inserted = self.store.insert_push_event(row).await?;
        let count = self.store.push_events().await.len();
        check_conditions(&mut inner.push_event_conditions, count);

        Ok(inserted)
    }

    async fn insert_commit_stats(&self, row: &CommitStatsRow) -> IngestResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.commit_stats_calls.push(row.sha.clone());

        if inner.failing_methods.contains(&StoreMethod::InsertCommitStats)
            || inner.failing_commits.contains(&row.sha)
        {
            return Err(ingest_error!(
                ErrorKind::StoreQueryFailed,
                "Injected store failure",
                format!("commit {}", row.sha)
            ));
        }

        let inserted = self.store.insert_commit_stats(row).await?;
        let count = self.store.commit_stats().await.len();
        check_conditions(&mut inner.commit_stats_conditions, count);

        Ok(inserted)
    }

    async fn global_net_lines(&self) -> IngestResult<i64> {
        self.check_method(StoreMethod::GlobalNetLines).await?;

        self.store.global_net_lines().await
    }

    async fn events_seen_count(&self) -> IngestResult<i64> {
        self.check_method(StoreMethod::EventsSeenCount).await?;

        self.store.events_seen_count().await
    }

    async fn ping(&self) -> IngestResult<()> {
        self.check_method(StoreMethod::Ping).await?;

        self.store.ping().await
    }
}
