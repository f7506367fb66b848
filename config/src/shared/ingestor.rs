use serde::Deserialize;

use crate::shared::{
    GithubConfig, PgConnectionConfig, PipelineConfig, ServerConfig, ValidationError,
};

/// Complete configuration of the ingestor binary.
///
/// Loaded once at startup and immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestorConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub database: PgConnectionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl IngestorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.github.validate()?;
        self.pipeline.validate()?;
        self.database.tls.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn minimal_config_only_needs_database() {
        let config: IngestorConfig = serde_json::from_str(
            r#"{
                "github": {"token": "ghp_secret"},
                "database": {"host": "db", "port": 5432, "name": "stats", "username": "ingest"}
            }"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.github.api_url, GithubConfig::DEFAULT_API_URL);
        assert_eq!(
            config.github.token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("ghp_secret")
        );
        assert_eq!(config.server.address(), "0.0.0.0:8080");
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn invalid_pipeline_section_fails_validation() {
        let config: IngestorConfig = serde_json::from_str(
            r#"{
                "pipeline": {"queue_capacity": 0},
                "database": {"host": "db", "port": 5432, "name": "stats", "username": "ingest"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.validate(), Err(ValidationError::QueueCapacityZero));
    }
}
