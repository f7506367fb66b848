use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::shared::ValidationError;

/// Application name reported to Postgres by the ingestor connections.
pub const APP_NAME_INGESTOR: &str = "push_stats_ingestor";

/// Connection settings for the Postgres database backing the stats store.
///
/// Holds a password, so it only implements [`Deserialize`].
#[derive(Debug, Clone, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default = "TlsConfig::disabled")]
    pub tls: TlsConfig,
}

impl PgConnectionConfig {
    /// Builds sqlx connect options targeting the configured database.
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.name)
    }

    /// Builds sqlx connect options without selecting a database.
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.tls.enabled {
            PgSslMode::VerifyFull
        } else {
            PgSslMode::Prefer
        };

        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .application_name(APP_NAME_INGESTOR)
            .ssl_mode(ssl_mode);

        if self.tls.enabled {
            options =
                options.ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes());
        }

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: String::new(),
            enabled: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_without_certificates_is_rejected() {
        let tls = TlsConfig {
            trusted_root_certs: String::new(),
            enabled: true,
        };

        assert_eq!(
            tls.validate(),
            Err(ValidationError::MissingTrustedRootCerts)
        );
        assert!(TlsConfig::disabled().validate().is_ok());
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let config: PgConnectionConfig = serde_json::from_str(
            r#"{"host": "localhost", "port": 5432, "name": "stats", "username": "ingest", "password": "hunter2"}"#,
        )
        .unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!config.tls.enabled);
    }
}
