use std::error::Error;

use ingest::error::IngestError;
use thiserror::Error;

/// Result type for ingestor operations.
pub type IngestorResult<T> = Result<T, IngestorError>;

/// Error type of the ingestor binary.
///
/// Wraps [`IngestError`] for pipeline and store failures and adds the infrastructure failures
/// that can only happen while the process starts or stops.
#[derive(Debug, Error)]
pub enum IngestorError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("configuration error: {0}")]
    Config(#[source] Box<dyn Error + Send + Sync>),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reporting server error: {0}")]
    Server(#[from] anyhow::Error),
}

impl IngestorError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            IngestorError::Ingest(_) => "ingestion error",
            IngestorError::Config(_) => "configuration error",
            IngestorError::Migration(_) => "migration error",
            IngestorError::Io(_) => "i/o error",
            IngestorError::Server(_) => "reporting server error",
        }
    }

    /// Creates a configuration error from any source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        IngestorError::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::error::ErrorKind;

    #[test]
    fn categories_follow_the_variant() {
        let err: IngestorError = ingest::ingest_error!(ErrorKind::ShutdownTimeout, "late").into();
        assert_eq!(err.category(), "ingestion error");

        let err: IngestorError = std::io::Error::other("boom").into();
        assert_eq!(err.category(), "i/o error");
        assert_eq!(err.to_string(), "i/o error: boom");

        let err = IngestorError::config(std::io::Error::other("bad value"));
        assert_eq!(err.category(), "configuration error");
        assert_eq!(err.to_string(), "configuration error: bad value");
        assert!(err.source().is_some());
    }
}
