use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`max_workers` cannot be zero")]
    MaxWorkersZero,
    #[error("`queue_capacity` cannot be zero")]
    QueueCapacityZero,
    #[error("`poll_interval_ms` cannot be zero")]
    PollIntervalZero,
    #[error("`github.api_url` cannot be empty")]
    EmptyApiUrl,
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
}
