use std::future::Future;

use crate::error::IngestResult;
use crate::types::{CommitStatsRow, PushEventRow};

/// Idempotent writes and aggregate reads over persisted ingestion data.
///
/// Both inserts are conditional on their key: inserting an existing key is not an error and is
/// reported by returning `false`. Implementations are shared by the producer and every worker, so
/// they must be safe to call concurrently.
pub trait StatsStore {
    /// Records a push event, returning whether it was newly inserted.
    ///
    /// The pipeline only fans out events for which this returns `true`.
    fn insert_push_event(
        &self,
        row: &PushEventRow,
    ) -> impl Future<Output = IngestResult<bool>> + Send;

    /// Records statistics for a commit, returning whether they were newly inserted.
    fn insert_commit_stats(
        &self,
        row: &CommitStatsRow,
    ) -> impl Future<Output = IngestResult<bool>> + Send;

    /// Returns the sum of `net` over every persisted commit.
    fn global_net_lines(&self) -> impl Future<Output = IngestResult<i64>> + Send;

    /// Returns the number of persisted push events.
    fn events_seen_count(&self) -> impl Future<Output = IngestResult<i64>> + Send;

    /// Checks that the store is reachable.
    fn ping(&self) -> impl Future<Output = IngestResult<()>> + Send;
}
