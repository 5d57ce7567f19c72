//! Service configuration
//!
//! Values come from an optional TOML file followed by `STATION_FEED__*`
//! environment variables, e.g. `STATION_FEED__SERVER__BIND_ADDR=127.0.0.1:9000`
//! or `STATION_FEED__AUTH__SIGNING_KEY=...`. Every key has a default.

use config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use decimator::Window;
use serde::Deserialize;
use storage::StorageConfig;

use crate::rate_limit::RateLimitConfig;

/// Config file used when `STATION_FEED_CONFIG` is unset (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "config/station-feed";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Largest accepted request body
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_body_limit() -> usize {
    1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            body_limit_bytes: default_body_limit(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct AuthSettings {
    /// Shared HMAC key; `None` turns signature checks off
    #[serde(default)]
    pub signing_key: Option<String>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuerySettings {
    /// Decimation bucket width in milliseconds
    #[serde(default)]
    pub window_ms: Window,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Settings {
    /// Load from `$STATION_FEED_CONFIG` (or the default path) plus the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("STATION_FEED_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("STATION_FEED")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use storage::Backend;

    fn from_toml(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml("");
        assert_eq!(settings.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(settings.server.body_limit_bytes, 1024);
        assert_eq!(settings.storage.backend, Backend::Sqlite);
        assert_eq!(settings.query.window_ms.millis(), 600_000);
        assert!(settings.auth.signing_key.is_none());
        assert!(settings.validation.temperature_range.is_none());
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_full_file() {
        let settings = from_toml(
            r#"
            log_format = "json"

            [server]
            bind_addr = "127.0.0.1:9000"
            body_limit_bytes = 4096
            cors_origins = ["https://charts.example.org"]

            [storage]
            backend = "memory"

            [auth]
            signing_key = "hunter2"

            [query]
            window_ms = 60000

            [validation]
            humidity_range = [0.0, 100.0]

            [rate_limit]
            per_second = 1
            burst_size = 20
            "#,
        );

        assert_eq!(settings.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(settings.server.cors_origins, ["https://charts.example.org"]);
        assert_eq!(settings.storage.backend, Backend::Memory);
        assert_eq!(settings.auth.signing_key.as_deref(), Some("hunter2"));
        assert_eq!(settings.query.window_ms.millis(), 60_000);
        assert_eq!(settings.validation.humidity_range, Some((0.0, 100.0)));
        assert_eq!(settings.rate_limit.burst_size, 20);
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = Config::builder()
            .add_source(File::from_str("[query]\nwindow_ms = 0", FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<Settings>();
        assert!(result.is_err());
    }

    #[test]
    fn test_signing_key_not_in_debug() {
        let auth = AuthSettings {
            signing_key: Some("hunter2".to_string()),
        };
        assert!(!format!("{:?}", auth).contains("hunter2"));
    }
}
