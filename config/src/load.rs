use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding the configuration files, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions probed, in order, for each configuration file.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix of environment variable overrides, e.g. `APP_GITHUB__TOKEN`.
const ENV_PREFIX: &str = "APP";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_SEPARATOR: &str = "__";

const BASE_FILE_STEM: &str = "base";

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    #[error("could not find `{stem}` configuration in `{directory}` (tried {attempted})")]
    ConfigurationFileMissing {
        stem: String,
        directory: PathBuf,
        attempted: String,
    },

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[source] io::Error),

    #[error("failed to build configuration: {0}")]
    Builder(#[source] rust_cli_config::ConfigError),

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] rust_cli_config::ConfigError),
}

/// Loads configuration from the `configuration` directory of the working directory.
///
/// Sources are layered in this order, later ones overriding earlier ones:
///
/// 1. `configuration/base.{yaml,yml,json}`
/// 2. `configuration/{environment}.{yaml,yml,json}`, where the environment comes from
///    `APP_ENVIRONMENT`
/// 3. `APP_`-prefixed environment variables, nested keys separated by `__`
///    (`APP_DATABASE__PASSWORD` sets `database.password`)
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load().map_err(LoadConfigError::Environment)?;

    load_config_from(&base_path.join(CONFIGURATION_DIR), environment)
}

/// Same as [`load_config`] with an explicit configuration directory and environment.
pub fn load_config_from<T>(
    configuration_directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    if !configuration_directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            configuration_directory.to_path_buf(),
        ));
    }

    let base_file = find_configuration_file(configuration_directory, BASE_FILE_STEM)?;
    let environment_file =
        find_configuration_file(configuration_directory, environment.as_str())?;

    let environment_source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = rust_cli_config::Config::builder()
        .add_source(rust_cli_config::File::from(base_file))
        .add_source(rust_cli_config::File::from(environment_file))
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

fn find_configuration_file(directory: &Path, stem: &str) -> Result<PathBuf, LoadConfigError> {
    let candidates: Vec<PathBuf> = CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .collect();

    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        return Ok(found.clone());
    }

    let attempted = candidates
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ");

    Err(LoadConfigError::ConfigurationFileMissing {
        stem: stem.to_owned(),
        directory: directory.to_path_buf(),
        attempted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        nested: Nested,
    }

    #[derive(Debug, Deserialize)]
    struct Nested {
        value: u32,
        flag: bool,
    }

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ingest-config-{label}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn environment_file_overrides_base_file() {
        let dir = scratch_dir("layering");
        fs::write(
            dir.join("base.yaml"),
            "name: base\nnested:\n  value: 1\n  flag: false\n",
        )
        .unwrap();
        fs::write(dir.join("prod.yaml"), "nested:\n  value: 2\n").unwrap();

        let sample: Sample = load_config_from(&dir, Environment::Prod).unwrap();

        assert_eq!(sample.name, "base");
        assert_eq!(sample.nested.value, 2);
        assert!(!sample.nested.flag);
    }

    #[test]
    fn json_files_are_accepted() {
        let dir = scratch_dir("json");
        fs::write(
            dir.join("base.json"),
            r#"{"name": "json", "nested": {"value": 5, "flag": true}}"#,
        )
        .unwrap();
        fs::write(dir.join("dev.json"), "{}").unwrap();

        let sample: Sample = load_config_from(&dir, Environment::Dev).unwrap();

        assert_eq!(sample.name, "json");
        assert!(sample.nested.flag);
    }

    #[test]
    fn missing_environment_file_is_reported() {
        let dir = scratch_dir("missing");
        fs::write(dir.join("base.yaml"), "name: x\n").unwrap();

        let err = load_config_from::<Sample>(&dir, Environment::Prod).unwrap_err();

        assert!(matches!(
            err,
            LoadConfigError::ConfigurationFileMissing { ref stem, .. } if stem == "prod"
        ));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = std::env::temp_dir().join("ingest-config-does-not-exist");
        let err = load_config_from::<Sample>(&dir, Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::MissingConfigurationDirectory(_)));
    }
}
