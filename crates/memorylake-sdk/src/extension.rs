//! MemoryLake client extension.
//!
//! Adds session events and reflection handles on top of the base memory
//! client. The extension holds the base client by composition and adds no
//! state of its own.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::issuer::{BlockingRequestIssuer, RequestIssuer};
use crate::reflection::{BlockingReflection, Reflection};
use memorylake_core::{
    BlockingMemoryClient, ClientConfig, MemoryClient, MemoryParams, Messages, Result, SyncType,
    TargetType, TelemetryEvent,
};

/// Chat session event endpoint
pub const SESSION_EVENT_PATH: &str = "/v3/chat_session/event/";

/// Payload marking a chat session as ended
fn session_end_payload(chat_session_id: &str, timestamp: i64) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("chat_session_id".into(), Value::from(chat_session_id));
    payload.insert("timestamp".into(), Value::from(timestamp));
    payload.insert("event_type".into(), Value::from("end"));
    payload
}

fn session_end_event(chat_session_id: &str, sync_type: SyncType) -> TelemetryEvent {
    TelemetryEvent::new("client.end_session", sync_type)
        .with_property("chat_session_id", chat_session_id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Async
// ─────────────────────────────────────────────────────────────────────────────

/// Async MemoryLake client
#[derive(Clone)]
pub struct MemoryLakeClient {
    base: MemoryClient,
}

impl MemoryLakeClient {
    /// Create a client talking HTTP to the configured host
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(MemoryClient::new(config)?))
    }

    /// Create a client from `~/.memorylake/config.toml` and the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_client(MemoryClient::from_env()?))
    }

    /// Wrap an already configured base client
    pub fn from_client(base: MemoryClient) -> Self {
        Self { base }
    }

    /// The wrapped base client
    pub fn base(&self) -> &MemoryClient {
        &self.base
    }

    /// Start a reflection on a user or location
    pub fn new_reflection(
        &self,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Reflection {
        Reflection::new(target_type, target_id, Arc::new(self.clone()))
    }

    /// Mark a chat session as ended at `timestamp` (Unix seconds)
    pub async fn end_session(&self, chat_session_id: &str, timestamp: i64) -> Result<Value> {
        debug!("Ending chat session {}", chat_session_id);
        let payload = self
            .base
            .prepare_params(session_end_payload(chat_session_id, timestamp))?;
        let response = self.base.post(SESSION_EVENT_PATH, payload).await?;
        self.base
            .telemetry()
            .capture(&session_end_event(chat_session_id, SyncType::Async));
        Ok(response)
    }

    /// Mark a chat session as ended now
    pub async fn end_session_now(&self, chat_session_id: &str) -> Result<Value> {
        self.end_session(chat_session_id, chrono::Utc::now().timestamp())
            .await
    }

    /// Normalize outgoing parameters the way the base client does
    pub fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>> {
        self.base.prepare_params(params)
    }

    /// Store messages as memories
    pub async fn add(&self, messages: impl Into<Messages>, params: MemoryParams) -> Result<Value> {
        self.base.add(messages, params).await
    }
}

#[async_trait]
impl RequestIssuer for MemoryLakeClient {
    fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>> {
        self.base.prepare_params(params)
    }

    async fn post(&self, path: &str, payload: Map<String, Value>) -> Result<Value> {
        self.base.post(path, payload).await
    }

    async fn add(&self, messages: Messages, params: MemoryParams) -> Result<Value> {
        self.base.add(messages, params).await
    }

    fn capture(&self, event: &TelemetryEvent) {
        self.base.telemetry().capture(event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocking
// ─────────────────────────────────────────────────────────────────────────────

/// Blocking MemoryLake client
#[derive(Clone)]
pub struct BlockingMemoryLakeClient {
    base: BlockingMemoryClient,
}

impl BlockingMemoryLakeClient {
    /// Create a client talking HTTP to the configured host
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(BlockingMemoryClient::new(config)?))
    }

    /// Create a client from `~/.memorylake/config.toml` and the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_client(BlockingMemoryClient::from_env()?))
    }

    /// Wrap an already configured base client
    pub fn from_client(base: BlockingMemoryClient) -> Self {
        Self { base }
    }

    /// The wrapped base client
    pub fn base(&self) -> &BlockingMemoryClient {
        &self.base
    }

    /// Start a reflection on a user or location
    pub fn new_reflection(
        &self,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> BlockingReflection {
        BlockingReflection::new(target_type, target_id, Arc::new(self.clone()))
    }

    /// Mark a chat session as ended at `timestamp` (Unix seconds)
    pub fn end_session(&self, chat_session_id: &str, timestamp: i64) -> Result<Value> {
        debug!("Ending chat session {}", chat_session_id);
        let payload = self
            .base
            .prepare_params(session_end_payload(chat_session_id, timestamp))?;
        let response = self.base.post(SESSION_EVENT_PATH, payload)?;
        self.base
            .telemetry()
            .capture(&session_end_event(chat_session_id, SyncType::Sync));
        Ok(response)
    }

    /// Mark a chat session as ended now
    pub fn end_session_now(&self, chat_session_id: &str) -> Result<Value> {
        self.end_session(chat_session_id, chrono::Utc::now().timestamp())
    }

    /// Normalize outgoing parameters the way the base client does
    pub fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>> {
        self.base.prepare_params(params)
    }

    /// Store messages as memories
    pub fn add(&self, messages: impl Into<Messages>, params: MemoryParams) -> Result<Value> {
        self.base.add(messages, params)
    }
}

impl BlockingRequestIssuer for BlockingMemoryLakeClient {
    fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>> {
        self.base.prepare_params(params)
    }

    fn post(&self, path: &str, payload: Map<String, Value>) -> Result<Value> {
        self.base.post(path, payload)
    }

    fn add(&self, messages: Messages, params: MemoryParams) -> Result<Value> {
        self.base.add(messages, params)
    }

    fn capture(&self, event: &TelemetryEvent) {
        self.base.telemetry().capture(event);
    }
}
