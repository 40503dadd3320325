// Application settings
//
// Layering: built-in defaults -> TOML file -> PIPES_STARTER_* environment variables.
// The file given with --settings must exist; the default location is optional.

use config::{Config, Environment, File, FileFormat};
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::builder::DEFAULT_CLI_PACKAGE;
use crate::utils::logging::mask_database_url;

pub const ENV_PREFIX: &str = "PIPES_STARTER";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 12;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid {key} '{value}': {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("request_timeout_secs must be greater than zero")]
    InvalidTimeout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cli_package: String,
    /// Remote config service (`POST /api/config`, `GET /api/config/<id>`).
    #[serde(default)]
    pub config_service_url: Option<String>,
    /// Contract metadata endpoint used by the custom-contracts picker.
    #[serde(default)]
    pub metadata_service_url: Option<String>,
    /// Postgres URL for a local config store when no service is configured.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cli_package: DEFAULT_CLI_PACKAGE.to_string(),
            config_service_url: None,
            metadata_service_url: None,
            database_url: None,
            catalog_path: None,
            log_dir: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_service_url(key: &'static str, value: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(value).map_err(|e| SettingsError::InvalidUrl {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SettingsError::InvalidUrl {
            key,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

impl Settings {
    /// Load from `explicit` (required) or `fallback` (optional), then the process environment.
    pub fn load(explicit: Option<&Path>, fallback: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with_env(explicit, fallback, None)
    }

    /// Same as [`Settings::load`], with the environment supplied as a map (tests) instead of
    /// read from the process.
    pub fn load_with_env(
        explicit: Option<&Path>,
        fallback: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, SettingsError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("cli_package", defaults.cli_package.as_str())?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?;

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        } else if let Some(path) = fallback {
            builder =
                builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.config_service_url = non_blank(settings.config_service_url.take());
        settings.metadata_service_url = non_blank(settings.metadata_service_url.take());
        settings.database_url = non_blank(settings.database_url.take());
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.request_timeout_secs == 0 {
            return Err(SettingsError::InvalidTimeout);
        }
        self.config_service_url()?;
        self.metadata_service_url()?;
        Ok(())
    }

    pub fn config_service_url(&self) -> Result<Option<Url>, SettingsError> {
        self.config_service_url
            .as_deref()
            .map(|v| parse_service_url("config_service_url", v))
            .transpose()
    }

    pub fn metadata_service_url(&self) -> Result<Option<Url>, SettingsError> {
        self.metadata_service_url
            .as_deref()
            .map(|v| parse_service_url("metadata_service_url", v))
            .transpose()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// One-line summary for the log; the database URL is masked.
    pub fn log_summary(&self) {
        info!(
            "[PHASE: initialization] [STEP: settings] cli_package={} config_service={} metadata_service={} database={} timeout={}s",
            self.cli_package,
            self.config_service_url.as_deref().unwrap_or("-"),
            self.metadata_service_url.as_deref().unwrap_or("-"),
            self.database_url
                .as_deref()
                .map(mask_database_url)
                .unwrap_or_else(|| "-".to_string()),
            self.request_timeout_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn settings_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let s = Settings::load_with_env(None, None, env(&[])).unwrap();
        assert_eq!(s.cli_package, DEFAULT_CLI_PACKAGE);
        assert_eq!(s.request_timeout(), Duration::from_secs(12));
        assert!(s.config_service_url.is_none());
        assert!(s.database_url.is_none());
    }

    #[test]
    fn file_then_env_override() {
        let file = settings_file(
            r#"
cli_package = "@acme/pipes"
config_service_url = "https://starter.example.com"
request_timeout_secs = 5
"#,
        );
        let s = Settings::load_with_env(
            Some(file.path()),
            None,
            env(&[("PIPES_STARTER_REQUEST_TIMEOUT_SECS", "30")]),
        )
        .unwrap();
        assert_eq!(s.cli_package, "@acme/pipes");
        assert_eq!(s.request_timeout_secs, 30, "env wins over file");
        assert_eq!(
            s.config_service_url().unwrap().unwrap().as_str(),
            "https://starter.example.com/"
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error_but_fallback_is_optional() {
        let missing = Path::new("/definitely/not/here/settings.toml");
        assert!(matches!(
            Settings::load_with_env(Some(missing), None, env(&[])),
            Err(SettingsError::Load(_))
        ));
        assert!(Settings::load_with_env(None, Some(missing), env(&[])).is_ok());
    }

    #[test]
    fn blank_urls_are_treated_as_unset() {
        let s = Settings::load_with_env(
            None,
            None,
            env(&[("PIPES_STARTER_DATABASE_URL", "  ")]),
        )
        .unwrap();
        assert!(s.database_url.is_none());
    }

    #[test]
    fn service_urls_must_be_http() {
        let err = Settings::load_with_env(
            None,
            None,
            env(&[("PIPES_STARTER_CONFIG_SERVICE_URL", "ftp://example.com")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"), "got {}", err);

        let err = Settings::load_with_env(
            None,
            None,
            env(&[("PIPES_STARTER_METADATA_SERVICE_URL", "not a url")]),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidUrl { key: "metadata_service_url", .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let s = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(SettingsError::InvalidTimeout)));
    }
}
