//! Application configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `.env` / process environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::credentials::DEFAULT_REFRESH_AFTER;
use crate::dispatch::GatePolicy;
use crate::notification::WebhookConfig;
use crate::notification::service::DEFAULT_ICON_URL;
use crate::resolver::DEFAULT_RESOLVER_URL;
use crate::{Error, Result};

/// Directory under the platform config dir.
pub const APP_DIR_NAME: &str = "tunelink";

const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_CLIENT_ID: &str = "TUNELINK_CLIENT_ID";
pub const ENV_TOKEN_URL: &str = "TUNELINK_TOKEN_URL";
pub const ENV_RESOLVER_URL: &str = "TUNELINK_RESOLVER_URL";
pub const ENV_STORE_PATH: &str = "TUNELINK_STORE_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Spotify application client id used for the refresh grant.
    pub client_id: String,
    /// Spotify accounts token endpoint.
    pub token_url: String,
    /// Origin of the song-resolver backend.
    pub resolver_url: String,
    /// Age in seconds after which the access token is refreshed.
    pub refresh_after_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// JSON file backing the shared store. In-memory when unset.
    pub store_path: Option<PathBuf>,
    /// Icon shown on every notification.
    pub icon_url: String,
    pub gate_policy: GatePolicy,
    pub webhook: Option<WebhookConfig>,
    /// Directory for daily-rolling log files. Console only when unset.
    pub log_dir: Option<PathBuf>,
    /// Configuration file this was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// `.env` file applied before the environment overrides, if any.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: spotify_auth::DEFAULT_CLIENT_ID.to_string(),
            token_url: spotify_auth::SPOTIFY_TOKEN_URL.to_string(),
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            refresh_after_secs: DEFAULT_REFRESH_AFTER.as_secs(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            store_path: None,
            icon_url: DEFAULT_ICON_URL.to_string(),
            gate_policy: GatePolicy::default(),
            webhook: None,
            log_dir: None,
            source: None,
            env_file: None,
        }
    }
}

impl AppConfig {
    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist; the default location is optional.
    /// The files read are recorded for [`AppConfig::log_sources`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_file = dotenvy::dotenv().ok();

        let source = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };
        let mut config = match &source {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.source = source;
        config.env_file = env_file;

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/tunelink/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    /// Apply `TUNELINK_*` overrides. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ENV_CLIENT_ID) {
            self.client_id = value;
        }
        if let Some(value) = get(ENV_TOKEN_URL) {
            self.token_url = value;
        }
        if let Some(value) = get(ENV_RESOLVER_URL) {
            self.resolver_url = value;
        }
        if let Some(value) = get(ENV_STORE_PATH) {
            self.store_path = Some(PathBuf::from(value));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::config("client_id must not be empty"));
        }
        for (name, value) in [
            ("token_url", &self.token_url),
            ("resolver_url", &self.resolver_url),
        ] {
            Url::parse(value).map_err(|e| Error::config(format!("{name} is invalid: {e}")))?;
        }
        if self.refresh_after_secs == 0 {
            return Err(Error::config("refresh_after_secs must be positive"));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(Error::config("timeouts must be positive"));
        }
        Ok(())
    }

    /// Report where the configuration came from.
    pub fn log_sources(&self) {
        match &self.source {
            Some(path) => info!(path = %path.display(), "Loaded configuration file"),
            None => info!("No configuration file found; using defaults"),
        }
        if let Some(path) = &self.env_file {
            debug!(path = %path.display(), "Loaded .env file");
        }
    }

    pub fn refresh_after(&self) -> Duration {
        Duration::from_secs(self.refresh_after_secs)
    }

    /// Shared HTTP client for the token endpoint and the resolver.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.refresh_after(), Duration::from_secs(3000));
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.resolver_url, "http://localhost:3000");
        assert_eq!(config.gate_policy, GatePolicy::Queue);
        assert!(config.store_path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            resolver_url = "https://resolver.example.com"
            gate_policy = "reject"

            [webhook]
            enabled = true
            url = "https://hooks.example.com/tunelink"
            "#,
        )
        .unwrap();

        assert_eq!(config.resolver_url, "https://resolver.example.com");
        assert_eq!(config.gate_policy, GatePolicy::Reject);
        assert_eq!(config.refresh_after_secs, 3000);
        let webhook = config.webhook.unwrap();
        assert!(webhook.enabled);
        assert_eq!(webhook.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml("refresh_after_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_RESOLVER_URL, "http://127.0.0.1:9000"),
            (ENV_STORE_PATH, "/tmp/tunelink/store.json"),
            (ENV_CLIENT_ID, "  "),
        ]);

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.resolver_url, "http://127.0.0.1:9000");
        assert_eq!(
            config.store_path.as_deref(),
            Some(Path::new("/tmp/tunelink/store.json"))
        );
        assert_eq!(config.client_id, spotify_auth::DEFAULT_CLIENT_ID);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            resolver_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            refresh_after_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "icon_url = \"icon.png\"\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.icon_url, "icon.png");
        assert!(config.source.is_none());

        assert!(AppConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_load_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = 30\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));

        assert!(AppConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
