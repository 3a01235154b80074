//! Configuration management for the JobBoard client and CLI
//!
//! Values are layered: built-in defaults, then an optional config file
//! (TOML or JSON, picked by extension), then `JOBBOARD_*` environment
//! variables. Nested keys use a double underscore, e.g.
//! `JOBBOARD_STORAGE__PERSISTENT=false`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LOGIN_PATH: &str = "/api/users/token/";
pub const DEFAULT_REFRESH_PATH: &str = "/api/users/token/refresh/";
pub const DEFAULT_LOGIN_ENTRY_POINT: &str = "/login";

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobboard")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobboard")
}

/// Where the credential slot lives
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Keep credentials on disk across restarts; `false` keeps them in memory only
    #[serde(default = "default_persistent")]
    pub persistent: bool,
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

fn default_persistent() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persistent: default_persistent(),
            storage_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(default_storage_dir)
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Where the user is sent when the session cannot be recovered
    #[serde(default = "default_login_entry_point")]
    pub login_entry_point: String,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_timeout() -> u64 {
    30
}

fn default_use_proxy() -> bool {
    true
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_login_entry_point() -> String {
    DEFAULT_LOGIN_ENTRY_POINT.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: default_timeout(),
            use_proxy: default_use_proxy(),
            login_path: default_login_path(),
            refresh_path: default_refresh_path(),
            login_entry_point: default_login_entry_point(),
            storage: StorageConfig::default(),
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<u64>,
    use_proxy: Option<bool>,
    storage: Option<StorageConfig>,
    config_file: Option<PathBuf>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn use_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = Some(use_proxy);
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_file_and_env(self.config_file.as_deref())?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(use_proxy) = self.use_proxy {
            config.use_proxy = use_proxy;
        }
        if let Some(storage) = self.storage {
            config.storage = storage;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Load from the default config file (if present) and the environment
    pub fn load() -> Result<Self> {
        let config = Self::from_file_and_env(Some(default_config_path()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClientError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = Self::from_file_and_env(Some(path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("timeout", default_timeout())?
            .set_default("use_proxy", default_use_proxy())?
            .set_default("login_path", DEFAULT_LOGIN_PATH)?
            .set_default("refresh_path", DEFAULT_REFRESH_PATH)?
            .set_default("login_entry_point", DEFAULT_LOGIN_ENTRY_POINT)?
            .set_default("storage.persistent", default_persistent())?;

        if let Some(config_path) = config_file {
            if config_path.as_ref().exists() {
                builder = builder.add_source(File::from(config_path.as_ref()));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("JOBBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::invalid_endpoint("Base URL cannot be empty"));
        }
        reqwest::Url::parse(&self.normalized_base_url()).map_err(|e| {
            ClientError::invalid_endpoint(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if self.timeout == 0 {
            return Err(ClientError::config("Timeout must be at least one second"));
        }
        if !self.refresh_path.starts_with('/') || !self.login_path.starts_with('/') {
            return Err(ClientError::config(
                "login_path and refresh_path must start with '/'",
            ));
        }
        Ok(())
    }

    fn normalized_base_url(&self) -> String {
        let base_url = self.base_url.trim();
        if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", base_url.trim_end_matches('/'))
        }
    }

    /// Join the base URL and an API path with exactly one slash.
    /// Absolute URLs are returned unchanged.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        format!("{}/{}", self.normalized_base_url(), endpoint)
    }
}
