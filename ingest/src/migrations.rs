use config::shared::PgConnectionConfig;
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Applies the `ingest` schema migrations.
///
/// The schema is created first and set as `search_path`, so the `_sqlx_migrations` bookkeeping
/// table lives next to the ingestion tables instead of in `public`.
pub async fn apply_migrations(connection_config: &PgConnectionConfig) -> Result<(), sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("create schema if not exists ingest;").await?;
                conn.execute("set search_path = 'ingest';").await?;

                Ok(())
            })
        })
        .connect_with(connection_config.with_db())
        .await?;

    info!("applying ingest migrations");

    let migrator = sqlx::migrate!("./migrations");
    migrator.run(&pool).await?;

    info!("ingest migrations successfully applied");

    pool.close().await;

    Ok(())
}
