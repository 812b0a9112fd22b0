//! Client telemetry events.
//!
//! Operations report a [`TelemetryEvent`] to the client's [`TelemetrySink`]
//! once a request has completed successfully. Failed requests report nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// Which operation family issued a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Sync,
    Async,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single client event, e.g. `client.end_session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub name: String,
    /// Event properties, always including `sync_type`
    pub properties: Map<String, Value>,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>, sync_type: SyncType) -> Self {
        let mut properties = Map::new();
        properties.insert("sync_type".into(), Value::from(sync_type.as_str()));
        Self {
            name: name.into(),
            properties,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The `sync_type` tag, if present
    pub fn sync_type(&self) -> Option<&str> {
        self.properties.get("sync_type").and_then(Value::as_str)
    }
}

/// Receiver for client events.
///
/// Capture is fire-and-forget: implementations must not fail the request.
pub trait TelemetrySink: Send + Sync {
    fn capture(&self, event: &TelemetryEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn capture(&self, _event: &TelemetryEvent) {}
}

/// Logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn capture(&self, event: &TelemetryEvent) {
        let properties = Value::Object(event.properties.clone());
        info!(
            event = %event.name,
            properties = %properties,
            "client event"
        );
    }
}
