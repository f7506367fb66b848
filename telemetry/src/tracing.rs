//! Tracing subscriber setup for the ingestor binary and for tests.

use std::io;
use std::sync::Once;

use config::Environment;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable enabling log output in tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

static INIT_TEST_TRACING: Once = Once::new();

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[source] io::Error),

    #[error("failed to redirect `log` records into tracing: {0}")]
    LogTracer(#[from] tracing_log::log::SetLoggerError),

    #[error("failed to install the global tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Flushes buffered log lines when dropped.
///
/// Must be held by `main` for the lifetime of the process, otherwise the last lines written
/// before exit are lost.
#[must_use = "dropping the flusher stops the background log writer"]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the process-wide tracing subscriber.
///
/// Log lines are written to stdout through a non-blocking writer. The filter is taken from
/// `RUST_LOG`, defaulting to `info` for every target plus `app_name`. In the `prod` environment
/// lines are emitted as JSON.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    let environment = Environment::load().map_err(TracingError::Environment)?;

    tracing_log::LogTracer::init()?;

    let (writer, guard) = tracing_appender::non_blocking(io::stdout());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{app_name}=info")));

    let registry = tracing_subscriber::registry().with(filter);
    match environment {
        Environment::Prod => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(writer),
            )
            .try_init()?,
        Environment::Dev => registry
            .with(fmt::layer().with_target(true).with_writer(writer))
            .try_init()?,
    }

    Ok(LogFlusher { _guard: guard })
}

/// Installs a test subscriber the first time it is called.
///
/// Nothing is printed unless `ENABLE_TRACING` is set, which keeps test output quiet by default.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var(ENABLE_TRACING_ENV_NAME).is_err() {
            return;
        }

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
