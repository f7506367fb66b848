use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::ValidationError;

const fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_api_url() -> String {
    GithubConfig::DEFAULT_API_URL.to_owned()
}

fn default_user_agent() -> String {
    GithubConfig::DEFAULT_USER_AGENT.to_owned()
}

/// Settings of the GitHub REST client used to list events and look up commits.
///
/// Holds the access token, so it only implements [`Deserialize`].
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// Base URL of the REST API, overridable for tests and GitHub Enterprise.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Access token sent as `Authorization: token <token>`. Anonymous when absent.
    #[serde(default)]
    pub token: Option<SecretString>,
    /// Value of the `User-Agent` header, which GitHub requires on every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Timeout applied to every request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl GithubConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";
    pub const DEFAULT_USER_AGENT: &'static str = "push-stats-ingestor";

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_url.trim().is_empty() {
            return Err(ValidationError::EmptyApiUrl);
        }

        Ok(())
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            user_agent: default_user_agent(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
