//! Blocking variant of the memory client.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::{ADD_PATH, AddRequest, BlockingHttpTransport, BlockingTransport, Scope};
use crate::config::{ClientConfig, ConfigValidationError};
use crate::error::Result;
use crate::telemetry::{NoopTelemetry, SyncType, TelemetrySink};
use crate::types::{MemoryParams, Messages};

/// Blocking memory API client.
///
/// Behaves exactly like [`super::MemoryClient`] but blocks the calling thread
/// on every request. Do not use it from inside an async runtime.
#[derive(Clone)]
pub struct BlockingMemoryClient {
    transport: Arc<dyn BlockingTransport>,
    scope: Scope,
    telemetry: Arc<dyn TelemetrySink>,
}

impl BlockingMemoryClient {
    /// Create a client talking HTTP to the configured host
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = BlockingHttpTransport::new(&config)?;
        Self::with_transport(Arc::new(transport), &config)
    }

    /// Create a client from `~/.memorylake/config.toml` and the environment
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::load()?)
    }

    /// Create a client over a caller-supplied transport.
    ///
    /// Only the scoping fields of `config` are used.
    pub fn with_transport(
        transport: Arc<dyn BlockingTransport>,
        config: &ClientConfig,
    ) -> Result<Self> {
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
    pub fn post(&self, path: &str, payload: Map<String, Value>) -> Result<Value> {
        self.transport.post(path, &Value::Object(payload))
    }

    /// Store messages as memories
    pub fn add(&self, messages: impl Into<Messages>, params: MemoryParams) -> Result<Value> {
        let request = AddRequest::build(&self.scope, messages.into(), &params)?;
        let response = self.transport.post(ADD_PATH, &request.payload)?;
        self.telemetry.capture(&request.event(SyncType::Sync));
        Ok(response)
    }
}
