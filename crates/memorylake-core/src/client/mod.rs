//! Base client for the MemoryLake memory API.
//!
//! [`MemoryClient`] (async) and [`BlockingMemoryClient`] (blocking) share the
//! same parameter normalization and payload construction; they differ only in
//! how the transport call is awaited.
//!
//! # Usage
//!
//! ```rust,no_run
//! use memorylake_core::client::MemoryClient;
//! use memorylake_core::{ClientConfig, MemoryParams};
//!
//! #[tokio::main]
//! async fn main() -> memorylake_core::Result<()> {
//!     let client = MemoryClient::new(ClientConfig::load()?)?;
//!     let params = MemoryParams::new().with_user_id("alice");
//!     client.add("I prefer window seats", params).await?;
//!     Ok(())
//! }
//! ```

mod blocking;
mod transport;

pub use blocking::BlockingMemoryClient;
pub use transport::{BlockingHttpTransport, BlockingTransport, HttpTransport, Transport};

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::{ClientConfig, ConfigValidationError};
use crate::error::Result;
use crate::telemetry::{NoopTelemetry, SyncType, TelemetryEvent, TelemetrySink};
use crate::types::{MemoryParams, Messages};

/// Generic memory write endpoint
pub const ADD_PATH: &str = "/v1/memories/";

/// Output format forced on every write
const OUTPUT_FORMAT: &str = "v1.1";

// ─────────────────────────────────────────────────────────────────────────────
// Shared request building
// ─────────────────────────────────────────────────────────────────────────────

/// Organization/project scoping applied to every outgoing payload
#[derive(Debug, Clone, Default)]
struct Scope {
    org_id: Option<String>,
    project_id: Option<String>,
}

impl Scope {
    fn from_config(config: &ClientConfig) -> Self {
        Self {
            org_id: config.org_id.clone(),
            project_id: config.project_id.clone(),
        }
    }

    /// Inject scoping and drop `null` values
    fn prepare(&self, mut params: Map<String, Value>) -> Result<Map<String, Value>> {
        match (&self.org_id, &self.project_id) {
            (Some(org_id), Some(project_id)) => {
                params.insert("org_id".into(), Value::from(org_id.as_str()));
                params.insert("project_id".into(), Value::from(project_id.as_str()));
            }
            (None, None) => {}
            _ => return Err(ConfigValidationError::PartialScope.into()),
        }

        params.retain(|_, v| !v.is_null());
        Ok(params)
    }
}

/// Payload and telemetry for a generic memory write
struct AddRequest {
    payload: Value,
    event_keys: Vec<String>,
}

impl AddRequest {
    fn build(scope: &Scope, messages: Messages, params: &MemoryParams) -> Result<Self> {
        let mut params = scope.prepare(params.to_map()?)?;
        params.insert("output_format".into(), Value::from(OUTPUT_FORMAT));

        let event_keys = params
            .keys()
            .filter(|k| k.as_str() != "metadata")
            .cloned()
            .collect();

        let mut payload = Map::new();
        payload.insert("messages".into(), serde_json::to_value(messages.into_vec())?);
        payload.extend(params);

        Ok(Self {
            payload: Value::Object(payload),
            event_keys,
        })
    }

    fn event(&self, sync_type: SyncType) -> TelemetryEvent {
        TelemetryEvent::new("client.add", sync_type).with_property("keys", self.event_keys.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Async client
// ─────────────────────────────────────────────────────────────────────────────

/// Async memory API client
#[derive(Clone)]
pub struct MemoryClient {
    transport: Arc<dyn Transport>,
    scope: Scope,
    telemetry: Arc<dyn TelemetrySink>,
}

impl MemoryClient {
    /// Create a client talking HTTP to the configured host
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(Arc::new(transport), &config)
    }

    /// Create a client from `~/.memorylake/config.toml` and the environment
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::load()?)
    }

    /// Create a client over a caller-supplied transport.
    ///
    /// Only the scoping fields of `config` are used.
    pub fn with_transport(transport: Arc<dyn Transport>, config: &ClientConfig) -> Result<Self> {
        if config.org_id.is_some() != config.project_id.is_some() {
            return Err(ConfigValidationError::PartialScope.into());
        }

        Ok(Self {
            transport,
            scope: Scope::from_config(config),
            telemetry: Arc::new(NoopTelemetry),
        })
    }

    /// Set the telemetry sink (default: no-op)
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Telemetry sink events are reported to
    pub fn telemetry(&self) -> &dyn TelemetrySink {
        self.telemetry.as_ref()
    }

    /// Normalize outgoing parameters (scoping, `null` removal)
    pub fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>> {
        self.scope.prepare(params)
    }

    /// POST a prepared payload and decode the response
    pub async fn post(&self, path: &str, payload: Map<String, Value>) -> Result<Value> {
        self.transport.post(path, &Value::Object(payload)).await
    }

    /// Store messages as memories
    pub async fn add(&self, messages: impl Into<Messages>, params: MemoryParams) -> Result<Value> {
        let request = AddRequest::build(&self.scope, messages.into(), &params)?;
        let response = self.transport.post(ADD_PATH, &request.payload).await?;
        self.telemetry.capture(&request.event(SyncType::Async));
        Ok(response)
    }
}
