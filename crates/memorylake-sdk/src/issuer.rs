//! Request capabilities a reflection needs from its client.
//!
//! Reflections never talk to the transport directly; they go through one of
//! these traits, which the extension clients implement by delegating to the
//! base memory client.

use async_trait::async_trait;
use serde_json::{Map, Value};

use memorylake_core::{MemoryParams, Messages, Result, TelemetryEvent};

/// Async request capability
#[async_trait]
pub trait RequestIssuer: Send + Sync {
    /// Normalize outgoing parameters
    fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>>;

    /// POST a prepared payload and decode the response
    async fn post(&self, path: &str, payload: Map<String, Value>) -> Result<Value>;

    /// Generic memory write
    async fn add(&self, messages: Messages, params: MemoryParams) -> Result<Value>;

    /// Report a telemetry event
    fn capture(&self, event: &TelemetryEvent);
}

/// Blocking request capability
pub trait BlockingRequestIssuer: Send + Sync {
    /// Normalize outgoing parameters
    fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>>;

    /// POST a prepared payload and decode the response
    fn post(&self, path: &str, payload: Map<String, Value>) -> Result<Value>;

    /// Generic memory write
    fn add(&self, messages: Messages, params: MemoryParams) -> Result<Value>;

    /// Report a telemetry event
    fn capture(&self, event: &TelemetryEvent);
}
