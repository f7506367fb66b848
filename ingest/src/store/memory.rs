use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::IngestResult;
use crate::store::base::StatsStore;
use crate::types::{CommitStatsRow, PushEventRow};

#[derive(Debug, Default)]
struct Inner {
    push_events: HashMap<String, PushEventRow>,
    commit_stats: HashMap<String, CommitStatsRow>,
}

/// In-memory [`StatsStore`].
///
/// Rows are keyed exactly like the Postgres tables, so duplicate handling matches production.
/// Everything is lost when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Returns a snapshot of every stored push event.
    pub async fn push_events(&self) -> HashMap<String, PushEventRow> {
        let inner = self.inner.lock().await;

        inner.push_events.clone()
    }

    /// Returns a snapshot of every stored commit statistics row.
    pub async fn commit_stats(&self) -> HashMap<String, CommitStatsRow> {
        let inner = self.inner.lock().await;

        inner.commit_stats.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsStore for MemoryStore {
    async fn insert_push_event(&self, row: &PushEventRow) -> IngestResult<bool> {
        let mut inner = self.inner.lock().await;

        if inner.push_events.contains_key(&row.id) {
            return Ok(false);
        }
        inner.push_events.insert(row.id.clone(), row.clone());

        Ok(true)
    }

    async fn insert_commit_stats(&self, row: &CommitStatsRow) -> IngestResult<bool> {
        let mut inner = self.inner.lock().await;

        if inner.commit_stats.contains_key(&row.sha) {
            return Ok(false);
        }
        inner.commit_stats.insert(row.sha.clone(), row.clone());

        Ok(true)
    }

    async fn global_net_lines(&self) -> IngestResult<i64> {
        let inner = self.inner.lock().await;

        Ok(inner.commit_stats.values().map(|row| row.net).sum())
    }

    async fn events_seen_count(&self) -> IngestResult<i64> {
        let inner = self.inner.lock().await;

        Ok(inner.push_events.len() as i64)
    }

    async fn ping(&self) -> IngestResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn push_event(id: &str) -> PushEventRow {
        PushEventRow {
            id: id.to_owned(),
            event_type: "PushEvent".to_owned(),
            created_at: None,
            actor_login: Some("octocat".to_owned()),
            repo_name: Some("octo/repo".to_owned()),
            raw_payload: Bytes::from_static(b"{}"),
        }
    }

    fn commit_stats(sha: &str, additions: i64, deletions: i64) -> CommitStatsRow {
        CommitStatsRow {
            sha: sha.to_owned(),
            repo_name: "octo/repo".to_owned(),
            author: None,
            committed_at: None,
            additions,
            deletions,
            total: additions + deletions,
            net: additions - deletions,
        }
    }

    #[tokio::test]
    async fn push_event_is_inserted_once() {
        let store = MemoryStore::new();

        assert!(store.insert_push_event(&push_event("e1")).await.unwrap());
        assert!(!store.insert_push_event(&push_event("e1")).await.unwrap());
        assert!(store.insert_push_event(&push_event("e2")).await.unwrap());

        assert_eq!(store.events_seen_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_commit_does_not_change_the_sum() {
        let store = MemoryStore::new();

        assert!(store.insert_commit_stats(&commit_stats("a", 10, 3)).await.unwrap());
        assert!(store.insert_commit_stats(&commit_stats("b", 1, 5)).await.unwrap());
        assert!(!store.insert_commit_stats(&commit_stats("a", 10, 3)).await.unwrap());

        assert_eq!(store.global_net_lines().await.unwrap(), 3);
        assert_eq!(store.commit_stats().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_store_reports_zero() {
        let store = MemoryStore::default();

        assert_eq!(store.global_net_lines().await.unwrap(), 0);
        assert_eq!(store.events_seen_count().await.unwrap(), 0);
        store.ping().await.unwrap();
    }
}
