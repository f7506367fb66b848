use config::shared::PipelineConfig;

use crate::concurrency::shutdown::create_shutdown_channel;
use crate::pipeline::Pipeline;
use crate::source::{CommitSource, EventSource};
use crate::store::StatsStore;

/// Pipeline configuration with short intervals, so tests do not wait on real time.
pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        poll_interval_ms: 20,
        queue_capacity: 16,
        max_workers: 2,
        fetch_error_delay_ms: 10,
        shutdown_grace_period_ms: 5_000,
    }
}

/// Creates a pipeline over the given doubles with its own shutdown channel.
pub fn create_pipeline<E, C, S>(
    config: PipelineConfig,
    event_source: E,
    commit_source: C,
    store: S,
) -> Pipeline<E, C, S>
where
    E: EventSource + Clone + Send + Sync + 'static,
    C: CommitSource + Clone + Send + Sync + 'static,
    S: StatsStore + Clone + Send + Sync + 'static,
{
    let (shutdown_tx, _) = create_shutdown_channel();

    Pipeline::new(config, event_source, commit_source, store, shutdown_tx)
}
