use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use crate::utils::file_get;

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_SETTINGS_PATH: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Process wide settings, loaded once before the server starts.
///
/// The loaded value is shared read-only between all workers, nothing
/// mutates it once the listener is up.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Shared secret expected in the `token` query parameter
    #[serde(default)]
    pub token: String,
    /// Upstream subscription fetched on every authorized request
    #[serde(default)]
    pub url: String,
    /// Local proxies injected into the upstream profile, kept untyped
    /// until a request coerces them
    #[serde(default)]
    pub proxy: Value,

    // Server
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub workers: usize,

    // Upstream fetch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    #[serde(default)]
    pub fetch_proxy: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(skip)]
    pub pref_path: String,
}

// Default value functions for serde
pub fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

pub fn default_listen_port() -> u16 {
    8080
}

pub fn default_path() -> String {
    "rewrite".to_string()
}

pub fn default_fetch_timeout() -> u64 {
    15
}

pub fn default_fetch_retries() -> u32 {
    1
}

pub fn default_user_agent() -> String {
    "clash-rewrite".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            token: String::new(),
            url: String::new(),
            proxy: Value::Null,
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            path: default_path(),
            workers: 0,
            fetch_timeout: default_fetch_timeout(),
            fetch_retries: default_fetch_retries(),
            fetch_proxy: String::new(),
            user_agent: default_user_agent(),
            pref_path: String::new(),
        }
    }
}

impl Settings {
    /// Create a new settings instance with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from YAML content and validate them
    pub fn load_from_content(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self, SettingsError> {
        let content = file_get(path).map_err(|source| SettingsError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut settings = Settings::load_from_content(&content)?;
        settings.pref_path = path.to_owned();
        Ok(settings)
    }

    /// Load settings from `path`, or from [`DEFAULT_SETTINGS_PATH`] when empty
    pub fn init(path: &str) -> Result<Self, SettingsError> {
        if path.is_empty() {
            Settings::load_from_file(DEFAULT_SETTINGS_PATH)
        } else {
            Settings::load_from_file(path)
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.token.is_empty() {
            return Err(SettingsError::Invalid("`token` must not be empty".into()));
        }
        let url = url::Url::parse(&self.url)
            .map_err(|e| SettingsError::Invalid(format!("`url` {:?}: {}", self.url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SettingsError::Invalid(format!(
                "`url` must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.fetch_timeout == 0 {
            return Err(SettingsError::Invalid(
                "`fetch_timeout` must be at least one second".into(),
            ));
        }
        Ok(())
    }

    /// Route the rewrite handler is mounted on, always with a leading slash
    pub fn route_path(&self) -> String {
        let path = self.path.trim().trim_start_matches('/');
        format!("/{}", path)
    }

    /// Socket address the server binds to
    pub fn listen_addr(&self) -> String {
        let address = if self.listen_address.trim().is_empty() {
            default_listen_address()
        } else {
            self.listen_address.trim().to_string()
        };
        if address.parse::<SocketAddr>().is_ok() || address.matches(':').count() == 1 {
            // Already has a port, use as is
            address
        } else if let Ok(IpAddr::V6(ip)) = address.parse::<IpAddr>() {
            format!("[{}]:{}", ip, self.listen_port)
        } else {
            format!("{}:{}", address, self.listen_port)
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}
