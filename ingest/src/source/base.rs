use std::future::Future;

use crate::error::IngestResult;
use crate::types::{CommitStats, EventBatch, EventsCursor};

/// Source of repository events, polled by the producer.
///
/// Implementations own their retry, backoff and rate-limit policy, so a returned error means that
/// policy gave up.
pub trait EventSource {
    /// Lists the events newer than what `cursor` describes.
    ///
    /// When nothing changed since `cursor`, returns an empty batch carrying the same or a
    /// refreshed cursor.
    fn fetch_events(
        &self,
        cursor: &EventsCursor,
    ) -> impl Future<Output = IngestResult<EventBatch>> + Send;
}

/// Source of per-commit line statistics, queried by the consumer workers.
pub trait CommitSource {
    /// Resolves the statistics of `reference` in `owner/repo`.
    ///
    /// A commit that cannot be found fails with [`crate::error::ErrorKind::SourceNotFound`],
    /// which callers treat as "skip this job" rather than as a failure.
    fn get_commit_stats(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> impl Future<Output = IngestResult<CommitStats>> + Send;
}
