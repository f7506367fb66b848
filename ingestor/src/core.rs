use api::startup::Application;
use config::shared::{GithubConfig, IngestorConfig, PgConnectionConfig, PipelineConfig};
use ingest::concurrency::shutdown::create_shutdown_channel;
use ingest::github::GithubClient;
use ingest::migrations::apply_migrations;
use ingest::pipeline::Pipeline;
use ingest::store::{PostgresStore, StatsStore};
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn};

use crate::error::IngestorResult;

/// Connections kept besides one per consumer worker, used by the producer and the reporting
/// server.
const EXTRA_STORE_CONNECTIONS: u32 = 2;

/// Runs the ingestor until a termination signal is received.
///
/// Storage is migrated and checked before anything is started, so an unreachable database stops
/// the process before the first fetch. On Ctrl-C or SIGTERM the pipeline is stopped first and the
/// reporting server afterwards, so `/stats` stays available while the last jobs are drained.
pub async fn start_ingestor_with_config(ingestor_config: IngestorConfig) -> IngestorResult<()> {
    info!("starting ingestor service");

    log_config(&ingestor_config);

    apply_migrations(&ingestor_config.database).await?;

    let max_connections = u32::from(ingestor_config.pipeline.max_workers) + EXTRA_STORE_CONNECTIONS;
    let store = PostgresStore::new(&ingestor_config.database, max_connections);
    if let Err(err) = store.ping().await {
        error!(error = %err, "statistics store is unreachable, aborting startup");

        return Err(err.into());
    }

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let github_client = GithubClient::new(&ingestor_config.github)?.with_shutdown_rx(shutdown_rx);

    let grace_period = ingestor_config.pipeline.shutdown_grace_period();

    let application = Application::build(&ingestor_config.server, grace_period, store.clone())?;
    let server_handle = application.handle();
    info!(port = application.port(), "reporting server listening");

    let mut pipeline = Pipeline::new(
        ingestor_config.pipeline,
        github_client.clone(),
        github_client,
        store.clone(),
        shutdown_tx,
    )
    .with_span(info_span!("pipeline"));
    pipeline.start().await?;

    let mut server_task = tokio::spawn(application.run_until_stopped());

    let server_exited = wait_for_termination(&mut server_task).await?;

    let pipeline_result = pipeline.shutdown_and_wait().await;

    if !server_exited {
        info!("stopping reporting server");
        server_handle.stop(true).await;

        match server_task.await {
            Ok(Ok(())) => info!("reporting server stopped"),
            Ok(Err(err)) => warn!(error = %err, "reporting server stopped with an error"),
            Err(err) => warn!(error = %err, "reporting server task failed"),
        }
    }

    store.close().await;

    pipeline_result?;

    info!("ingestor service stopped");

    Ok(())
}

/// Waits for Ctrl-C, SIGTERM or the reporting server exiting on its own.
///
/// Returns whether the server already exited.
async fn wait_for_termination(
    server_task: &mut JoinHandle<std::io::Result<()>>,
) -> IngestorResult<bool> {
    let mut sigterm = signal(SignalKind::terminate())?;

    let server_exited = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("sigint (ctrl+c) received, shutting down");
            false
        }
        _ = sigterm.recv() => {
            info!("sigterm received, shutting down");
            false
        }
        result = server_task => {
            match result {
                Ok(Ok(())) => warn!("reporting server exited unexpectedly, shutting down"),
                Ok(Err(err)) => error!(error = %err, "reporting server failed, shutting down"),
                Err(err) => error!(error = %err, "reporting server task failed, shutting down"),
            }
            true
        }
    };

    Ok(server_exited)
}

fn log_config(config: &IngestorConfig) {
    log_github_config(&config.github);
    log_pipeline_config(&config.pipeline);
    log_database_config(&config.database);
    debug!(host = %config.server.host, port = config.server.port, "reporting server config");
}

fn log_github_config(config: &GithubConfig) {
    debug!(
        api_url = %config.api_url,
        user_agent = %config.user_agent,
        request_timeout_ms = config.request_timeout_ms,
        token_configured = config.token.is_some(),
        "github config"
    );
}

fn log_pipeline_config(config: &PipelineConfig) {
    debug!(
        poll_interval_ms = config.poll_interval_ms,
        queue_capacity = config.queue_capacity,
        max_workers = config.max_workers,
        fetch_error_delay_ms = config.fetch_error_delay_ms,
        shutdown_grace_period_ms = config.shutdown_grace_period_ms,
        "pipeline config"
    );
}

fn log_database_config(config: &PgConnectionConfig) {
    debug!(
        host = %config.host,
        port = config.port,
        dbname = %config.name,
        username = %config.username,
        tls_enabled = config.tls.enabled,
        "database config"
    );
}
