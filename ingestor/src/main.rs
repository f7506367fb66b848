//! Push statistics ingestor binary.
//!
//! Runs the ingestion pipeline polling the GitHub events API next to the read-only reporting
//! server, until the process receives Ctrl-C or SIGTERM.

use ::config::shared::IngestorConfig;
use telemetry::tracing::init_tracing;
use tracing::error;

use crate::config::load_ingestor_config;
use crate::core::start_ingestor_with_config;
use crate::error::{IngestorError, IngestorResult};

mod config;
mod core;
mod error;

/// Entry point for the ingestor service.
///
/// Loads configuration and initializes tracing before the async runtime starts.
fn main() -> IngestorResult<()> {
    let ingestor_config = load_ingestor_config()?;

    // Dropping the flusher would lose the last buffered log lines.
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(IngestorError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(ingestor_config))?;

    Ok(())
}

async fn async_main(ingestor_config: IngestorConfig) -> IngestorResult<()> {
    if let Err(err) = start_ingestor_with_config(ingestor_config).await {
        error!(category = err.category(), "{err}");

        return Err(err);
    }

    Ok(())
}
