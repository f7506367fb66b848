use std::time::Duration;

use config::shared::PgConnectionConfig;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use crate::error::IngestResult;
use crate::store::base::StatsStore;
use crate::types::{CommitStatsRow, PushEventRow};

/// Duration after which idle connections are closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a pool that connects on first use and closes idle connections.
fn create_database_pool(config: &PgConnectionConfig, max_connections: u32) -> PgPool {
    PgPoolOptions::new()
        .min_connections(0)
        .max_connections(max_connections)
        .idle_timeout(Some(IDLE_TIMEOUT))
        .connect_lazy_with(config.with_db())
}

/// [`StatsStore`] backed by the `ingest` schema of a Postgres database.
///
/// Uniqueness is enforced by the primary keys of `ingest.push_events` and `ingest.commit_stats`, so
/// concurrent inserts of the same key from different workers are resolved by the database.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store without opening any connection yet.
    ///
    /// `max_connections` should cover the producer, every worker and the reporting API.
    pub fn new(config: &PgConnectionConfig, max_connections: u32) -> Self {
        Self {
            pool: create_database_pool(config, max_connections),
        }
    }

    /// Closes every connection of the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl StatsStore for PostgresStore {
    async fn insert_push_event(&self, row: &PushEventRow) -> IngestResult<bool> {
        let result = sqlx::query(
            r#"
            insert into ingest.push_events (id, event_type, created_at, actor_login, repo_name, raw_payload)
            values ($1, $2, $3, $4, $5, $6)
            on conflict (id) do nothing
            "#,
        )
        .bind(&row.id)
        .bind(&row.event_type)
        .bind(row.created_at)
        .bind(row.actor_login.as_deref())
        .bind(row.repo_name.as_deref())
        .bind(row.raw_payload.as_ref())
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(event_id = %row.id, inserted, "push event insert completed");

        Ok(inserted)
    }

    async fn insert_commit_stats(&self, row: &CommitStatsRow) -> IngestResult<bool> {
        let result = sqlx::query(
            r#"
            insert into ingest.commit_stats (sha, repo_name, author, committed_at, additions, deletions, total, net)
            values ($1, $2, $3, $4, $5, $6, $7, $8)
            on conflict (sha) do nothing
            "#,
        )
        .bind(&row.sha)
        .bind(&row.repo_name)
        .bind(row.author.as_deref())
        .bind(row.committed_at)
        .bind(row.additions)
        .bind(row.deletions)
        .bind(row.total)
        .bind(row.net)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn global_net_lines(&self) -> IngestResult<i64> {
        let net: i64 =
            sqlx::query_scalar("select coalesce(sum(net), 0)::bigint from ingest.commit_stats")
                .fetch_one(&self.pool)
                .await?;

        Ok(net)
    }

    async fn events_seen_count(&self) -> IngestResult<i64> {
        let count: i64 = sqlx::query_scalar("select count(*) from ingest.push_events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> IngestResult<()> {
        sqlx::query("select 1").execute(&self.pool).await?;

        Ok(())
    }
}
