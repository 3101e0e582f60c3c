use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TARVENOTE_CONFIG";

/// Largest subgraph depth the backend accepts.
pub const MAX_SUBGRAPH_DEPTH: u32 = 4;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tarvenote: TarvenoteConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// General process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TarvenoteConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TarvenoteConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Graph backend connection
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Used when no backend URL has been saved in the settings store.
    #[serde(default = "default_backend_url")]
    pub default_url: String,
    /// Per-request timeout; 0 disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            default_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Where user settings (backend URL, tools flag) are persisted
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_path")]
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

/// Graph view depths
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Depth of the default "full graph" view.
    #[serde(default = "default_full_depth")]
    pub full_depth: u32,
    /// Depth of a search centred on a typed name.
    #[serde(default = "default_search_depth")]
    pub search_depth: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            full_depth: default_full_depth(),
            search_depth: default_search_depth(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_http_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_authless")]
    pub authless: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            api_key_env: default_http_api_key_env(),
            allowed_origins: Vec::new(),
            authless: default_authless(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("tarvenote-settings.toml")
}

fn default_full_depth() -> u32 {
    4
}

fn default_search_depth() -> u32 {
    2
}

fn default_http_port() -> u16 {
    8081
}

fn default_http_api_key_env() -> String {
    "TARVENOTE_API_KEY".to_string()
}

fn default_authless() -> bool {
    false
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in TARVENOTE_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (defaults are used when absent)
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("No config.toml found, using defaults");
                    Config::default()
                }
            }
        };

        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend.default_url).with_context(|| {
            format!(
                "backend.default_url is not a valid URL: {}",
                self.backend.default_url
            )
        })?;

        for (name, depth) in [
            ("graph.full_depth", self.graph.full_depth),
            ("graph.search_depth", self.graph.search_depth),
        ] {
            if depth == 0 || depth > MAX_SUBGRAPH_DEPTH {
                anyhow::bail!("{} must be between 1 and {}", name, MAX_SUBGRAPH_DEPTH);
            }
        }

        Ok(())
    }

    /// Backend request timeout, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.backend.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Log filter used when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &str {
        &self.tarvenote.log_level
    }

    /// Get settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings.path
    }
}
