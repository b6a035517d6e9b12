//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/mifit-export/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/mifit-export/` (~/.config/mifit-export/)
//! - State/Logs: `$XDG_STATE_HOME/mifit-export/` (~/.local/state/mifit-export/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "mifit-export";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Mi Fit API endpoints and request parameters
    #[serde(default)]
    pub api: ApiConfig,

    /// Authorization code acquisition
    #[serde(default)]
    pub auth: AuthConfig,

    /// Default cache location
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mi Fit API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Huami account server (login endpoint)
    #[serde(default = "default_account_url")]
    pub account_url: String,

    /// Mi Fit data server (history and detail endpoints)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// `app_version` sent at login
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// `country_code` sent at login
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// `device_model` sent at login
    #[serde(default = "default_device_model")]
    pub device_model: String,

    /// Track sources requested from the history endpoint
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            account_url: default_account_url(),
            api_url: default_api_url(),
            timeout_secs: default_timeout(),
            app_version: default_app_version(),
            country_code: default_country_code(),
            device_model: default_device_model(),
            sources: default_sources(),
        }
    }
}

impl ApiConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.account_url.trim().is_empty() {
            return Err(Error::Config("api.account_url must not be empty".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(Error::Config("api.api_url must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(Error::Config("api.sources must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_account_url() -> String {
    "https://account.huami.com".to_string()
}

fn default_api_url() -> String {
    "https://api-mifit-de.huami.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_app_version() -> String {
    "4.0.7".to_string()
}

fn default_country_code() -> String {
    "GB".to_string()
}

fn default_device_model() -> String {
    "gpx-exporter".to_string()
}

fn default_sources() -> Vec<String> {
    [
        "run.34.huami.com",
        "run.watch.qogir.huami.com",
        "run.28.huami.com",
        "run.watch.huami.com",
        "run.25.huami.com",
        "run.beats.huami.com",
        "run.46.huami.com",
        "run.26.huami.com",
        "run.31.huami.com",
        "run.27.huami.com",
        "run.beatsp.huami.com",
        "run.44.huami.com",
        "run.24.huami.com",
        "run.chaohu.huami.com",
        "run.43.huami.com",
        "run.wuhan.huami.com",
        "run.30.huami.com",
        "run.45.huami.com",
        "run.watch.everests.huami.com",
        "run.tempo.huami.com",
        "run.35.huami.com",
        "run.watch.everest.huami.com",
        "run.36.huami.com",
        "run.42.huami.com",
        "run.mifit.huami.com",
        "run.41.huami.com",
        "run.chongqing.huami.com",
        "run.38.huami.com",
        "run.29.huami.com",
        "run.39.huami.com",
        "run.dongtinghu.huami.com",
        "run.37.huami.com",
        "run.40.huami.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Authorization configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Google OAuth client id the authorization code is requested for
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// `token-cli` executable
    #[serde(default = "default_token_cli")]
    pub token_cli: PathBuf,

    /// OpenID discovery document registered as the token-cli target
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            token_cli: default_token_cli(),
            discovery_url: default_discovery_url(),
        }
    }
}

fn default_client_id() -> String {
    "571394967398-j6vs98u325la013f0ho6hehosdi2h2eb.apps.googleusercontent.com".to_string()
}

fn default_token_cli() -> PathBuf {
    PathBuf::from("token-cli")
}

fn default_discovery_url() -> String {
    "https://accounts.google.com/.well-known/openid-configuration".to_string()
}

/// Cache configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CacheConfig {
    /// Cache directory used when none is given on the command line
    pub dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.api.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/mifit-export/config.toml` (~/.config/mifit-export/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/mifit-export/` (~/.local/state/mifit-export/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }
}
