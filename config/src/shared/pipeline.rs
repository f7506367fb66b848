use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

const fn default_poll_interval_ms() -> u64 {
    60_000
}

const fn default_queue_capacity() -> usize {
    1_000
}

const fn default_max_workers() -> u16 {
    3
}

const fn default_fetch_error_delay_ms() -> u64 {
    5_000
}

const fn default_shutdown_grace_period_ms() -> u64 {
    10_000
}

/// Configuration of the ingestion pipeline.
///
/// Controls the polling cadence of the producer, the bounded queue between the producer and the
/// consumer workers, and how long shutdown may take.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Milliseconds slept by the producer between two event fetches.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of commit jobs buffered between the producer and the workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Number of consumer workers resolving commit jobs in parallel.
    #[serde(default = "default_max_workers")]
    pub max_workers: u16,
    /// Milliseconds the producer idles after a failed fetch before polling again.
    #[serde(default = "default_fetch_error_delay_ms")]
    pub fetch_error_delay_ms: u64,
    /// Milliseconds granted to the pipeline to stop after shutdown was requested.
    #[serde(default = "default_shutdown_grace_period_ms")]
    pub shutdown_grace_period_ms: u64,
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_error_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_error_delay_ms)
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_period_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_workers == 0 {
            return Err(ValidationError::MaxWorkersZero);
        }

        if self.queue_capacity == 0 {
            return Err(ValidationError::QueueCapacityZero);
        }

        if self.poll_interval_ms == 0 {
            return Err(ValidationError::PollIntervalZero);
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            queue_capacity: default_queue_capacity(),
            max_workers: default_max_workers(),
            fetch_error_delay_ms: default_fetch_error_delay_ms(),
            shutdown_grace_period_ms: default_shutdown_grace_period_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"max_workers": 8}"#).unwrap();

        assert_eq!(config.max_workers, 8);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.queue_capacity, 1_000);
        assert_eq!(config.shutdown_grace_period(), Duration::from_secs(10));
    }

    #[test]
    fn zero_values_are_rejected() {
        let config = PipelineConfig {
            max_workers: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::MaxWorkersZero));

        let config = PipelineConfig {
            queue_capacity: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::QueueCapacityZero));

        let config = PipelineConfig {
            poll_interval_ms: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::PollIntervalZero));

        assert!(PipelineConfig::default().validate().is_ok());
    }
}
