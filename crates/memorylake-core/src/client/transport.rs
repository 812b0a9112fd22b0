//! HTTP transports for the memory API.
//!
//! A transport sends one JSON POST and returns the decoded body. Failure
//! statuses are turned into [`Error::Api`] before anything is decoded, so the
//! caller never sees a body from a failed request.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ConfigValidationError};
use crate::error::{Error, Result};

/// Async request capability
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `path` and decode the JSON response
    async fn post(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Blocking request capability
pub trait BlockingTransport: Send + Sync {
    /// POST `body` as JSON to `path` and decode the JSON response
    fn post(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Host and credentials shared by both HTTP transports
#[derive(Clone)]
struct Endpoint {
    base_url: String,
    token: String,
}

impl Endpoint {
    fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigValidationError::MissingApiKey)?;

        Ok(Self {
            base_url: config.host.trim_end_matches('/').to_string(),
            token: format!("Token {}", api_key),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Async
// ─────────────────────────────────────────────────────────────────────────────

/// Transport backed by an async `reqwest::Client`
#[derive(Clone)]
pub struct HttpTransport {
    endpoint: Endpoint,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from the host, API key and timeout in `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = Endpoint::from_config(config)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint.url(path);
        debug!("API request: POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &self.endpoint.token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!("POST {} failed: {}", path, e);
                Error::Request(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            warn!("API error {} on POST {}", status, path);
            return Err(Error::api(status.as_u16(), error_text));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocking
// ─────────────────────────────────────────────────────────────────────────────

/// Transport backed by `reqwest::blocking::Client`.
///
/// Must not be created or used from inside an async runtime.
#[derive(Clone)]
pub struct BlockingHttpTransport {
    endpoint: Endpoint,
    client: reqwest::blocking::Client,
}

impl BlockingHttpTransport {
    /// Build a transport from the host, API key and timeout in `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = Endpoint::from_config(config)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self { endpoint, client })
    }
}

impl BlockingTransport for BlockingHttpTransport {
    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint.url(path);
        debug!("API request: POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &self.endpoint.token)
            .json(body)
            .send()
            .map_err(|e| {
                warn!("POST {} failed: {}", path, e);
                Error::Request(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().unwrap_or_default();
            warn!("API error {} on POST {}", status, path);
            return Err(Error::api(status.as_u16(), error_text));
        }

        resp.json::<Value>().map_err(|e| Error::Decode(e.to_string()))
    }
}
