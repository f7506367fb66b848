use chrono::{DateTime, Utc};

/// Pending work: resolve and persist the statistics of one commit.
///
/// Never persisted, it only lives while queued or being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitJob {
    pub event_id: String,
    pub owner: String,
    pub repo: String,
    /// Commit sha or any other reference the source can resolve.
    pub reference: String,
}

impl CommitJob {
    pub fn repo_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Line statistics of a commit as resolved by a [`crate::source::CommitSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStats {
    pub sha: String,
    pub author: Option<String>,
    pub committed_at: Option<DateTime<Utc>>,
    pub additions: i64,
    pub deletions: i64,
    pub total: i64,
}

impl CommitStats {
    /// Lines added minus lines deleted, independent of the reported total.
    pub fn net(&self) -> i64 {
        self.additions - self.deletions
    }
}

/// Persisted form of a commit's statistics, keyed by sha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatsRow {
    pub sha: String,
    pub repo_name: String,
    pub author: Option<String>,
    pub committed_at: Option<DateTime<Utc>>,
    pub additions: i64,
    pub deletions: i64,
    pub total: i64,
    /// Always `additions - deletions`.
    pub net: i64,
}

impl CommitStatsRow {
    /// Builds the row for `job` from the resolved `stats`.
    ///
    /// The sha reported by the source wins over the job reference, which may be abbreviated or
    /// symbolic.
    pub fn new(job: &CommitJob, stats: CommitStats) -> Self {
        let net = stats.net();
        let sha = if stats.sha.is_empty() {
            job.reference.clone()
        } else {
            stats.sha
        };

        Self {
            sha,
            repo_name: job.repo_name(),
            author: stats.author,
            committed_at: stats.committed_at,
            additions: stats.additions,
            deletions: stats.deletions,
            total: stats.total,
            net,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> CommitJob {
        CommitJob {
            event_id: "e1".to_owned(),
            owner: "octo".to_owned(),
            repo: "repo".to_owned(),
            reference: "abc".to_owned(),
        }
    }

    #[test]
    fn net_ignores_reported_total() {
        let stats = CommitStats {
            sha: "abcdef".to_owned(),
            author: Some("Mona".to_owned()),
            committed_at: None,
            additions: 10,
            deletions: 3,
            total: 13,
        };

        let row = CommitStatsRow::new(&job(), stats);

        assert_eq!(row.net, 7);
        assert_eq!(row.total, 13);
        assert_eq!(row.sha, "abcdef");
        assert_eq!(row.repo_name, "octo/repo");
    }

    #[test]
    fn job_reference_is_used_when_source_omits_sha() {
        let stats = CommitStats {
            sha: String::new(),
            author: None,
            committed_at: None,
            additions: 0,
            deletions: 4,
            total: 99,
        };

        let row = CommitStatsRow::new(&job(), stats);

        assert_eq!(row.sha, "abc");
        assert_eq!(row.net, -4);
    }
}
