use ::config::load_config;
use ::config::shared::IngestorConfig;

use crate::error::{IngestorError, IngestorResult};

/// Loads and validates the ingestor configuration.
///
/// Files come from the `configuration` directory, overridden by `APP_` environment variables.
pub fn load_ingestor_config() -> IngestorResult<IngestorConfig> {
    let config = load_config::<IngestorConfig>().map_err(IngestorError::config)?;
    config.validate().map_err(IngestorError::config)?;

    Ok(config)
}
