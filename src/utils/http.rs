use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Proxy};
use thiserror::Error;

use crate::settings::Settings;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 15;

/// Base delay between two fetch attempts, multiplied by the attempt number
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to set proxy: {0}")]
    Proxy(#[source] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Timed out after {0:?} fetching upstream")]
    Timeout(Duration),

    #[error("Failed to send request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Request(_) | FetchError::Body(_) => true,
            FetchError::Status(status) => status.is_server_error(),
            FetchError::Proxy(_) | FetchError::Client(_) => false,
        }
    }
}

/// How the upstream fetch reaches the network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`ALL_PROXY` from the environment
    #[default]
    System,
    /// Always connect directly
    Direct,
    /// Route everything through the given proxy URL
    Custom(String),
}

pub fn parse_proxy(proxy_str: &str) -> ProxyConfig {
    match proxy_str.trim() {
        "" | "SYSTEM" => ProxyConfig::System,
        "NONE" => ProxyConfig::Direct,
        proxy => ProxyConfig::Custom(proxy.to_string()),
    }
}

/// Options for a single upstream fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub proxy: ProxyConfig,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            retries: 0,
            proxy: ProxyConfig::default(),
            user_agent: "clash-rewrite".to_string(),
        }
    }
}

impl From<&Settings> for FetchOptions {
    fn from(settings: &Settings) -> Self {
        FetchOptions {
            timeout: settings.fetch_timeout(),
            retries: settings.fetch_retries,
            proxy: parse_proxy(&settings.fetch_proxy),
            user_agent: settings.user_agent.clone(),
        }
    }
}

fn build_client(options: &FetchOptions) -> Result<Client, FetchError> {
    let mut client_builder = Client::builder()
        .timeout(options.timeout)
        .user_agent(options.user_agent.as_str());

    match &options.proxy {
        ProxyConfig::System => {}
        ProxyConfig::Direct => {
            client_builder = client_builder.no_proxy();
        }
        ProxyConfig::Custom(proxy) => {
            let proxy = Proxy::all(proxy).map_err(FetchError::Proxy)?;
            client_builder = client_builder.proxy(proxy);
        }
    }

    client_builder.build().map_err(FetchError::Client)
}

async fn web_get_once(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Request(e)
        }
    })?;

    // Check status code
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    response.text().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Body(e)
        }
    })
}

/// Fetch `url` and return its body as text.
///
/// Transient failures (timeouts, connection errors, 5xx) are retried up to
/// `options.retries` more times with a linear backoff. A non-success
/// status is always reported as an error, never as a body.
pub async fn web_get_async(url: &str, options: &FetchOptions) -> Result<String, FetchError> {
    let client = build_client(options)?;

    let mut attempt = 0;
    loop {
        debug!("Fetching {} (attempt {})", url, attempt + 1);
        match web_get_once(&client, url, options.timeout).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() && attempt < options.retries => {
                attempt += 1;
                warn!("Fetching {} failed: {}, retrying", url, e);
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}
