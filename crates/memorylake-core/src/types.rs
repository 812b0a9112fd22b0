//! Shared types for memorylake-core.
//!
//! These types are used by both the base client and the extension layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────────────────
// Reflection Targets
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of entity a reflection concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    User,
    Location,
}

impl TargetType {
    /// Convert from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Location => "location",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `(target_type, target_id)` pair carried as `reflect_target`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReflectTarget {
    pub target_type: TargetType,
    pub target_id: String,
}

impl ReflectTarget {
    pub fn new(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            target_type,
            target_id: target_id.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// A single conversation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// "user", "assistant" or "system"
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Messages accepted by memory writes.
///
/// Plain text is sent as one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Messages {
    Text(String),
    One(Message),
    Many(Vec<Message>),
}

impl Messages {
    /// Normalize into the list form the API expects
    pub fn into_vec(self) -> Vec<Message> {
        match self {
            Self::Text(content) => vec![Message::user(content)],
            Self::One(message) => vec![message],
            Self::Many(messages) => messages,
        }
    }
}

impl From<&str> for Messages {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Messages {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Message> for Messages {
    fn from(message: Message) -> Self {
        Self::One(message)
    }
}

impl From<Vec<Message>> for Messages {
    fn from(messages: Vec<Message>) -> Self {
        Self::Many(messages)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for memory reads and writes.
///
/// Known fields are typed; anything else the service accepts goes in `extra`,
/// which is flattened into the payload. `None` fields are omitted. A typed
/// field that is set wins over an `extra` entry of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Recollect query text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Free-form metadata stored alongside the memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemoryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Replace the metadata map
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set one metadata key, creating the map if needed
    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set an arbitrary top-level payload key
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Serialize into a JSON object
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        let typed = Self {
            extra: Map::new(),
            ..self.clone()
        };

        let mut map = self.extra.clone();
        if let Value::Object(fields) = serde_json::to_value(typed)? {
            map.extend(fields);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_type_strings() {
        assert_eq!(TargetType::User.as_str(), "user");
        assert_eq!(TargetType::from_str("location"), Some(TargetType::Location));
        assert_eq!(TargetType::from_str("team"), None);
        assert_eq!(serde_json::to_value(TargetType::Location).unwrap(), json!("location"));
    }

    #[test]
    fn test_reflect_target_serialization() {
        let target = ReflectTarget::new(TargetType::User, "u-1");
        assert_eq!(
            serde_json::to_value(&target).unwrap(),
            json!({"target_type": "user", "target_id": "u-1"})
        );
    }

    #[test]
    fn test_messages_normalization() {
        assert_eq!(
            Messages::from("hello").into_vec(),
            vec![Message::user("hello")]
        );
        assert_eq!(
            Messages::from(Message::assistant("hi")).into_vec(),
            vec![Message::assistant("hi")]
        );

        let many = vec![Message::user("a"), Message::assistant("b")];
        assert_eq!(Messages::from(many.clone()).into_vec(), many);
    }

    #[test]
    fn test_params_omit_unset_fields() {
        let params = MemoryParams::new().with_user_id("alice");
        assert_eq!(
            Value::Object(params.to_map().unwrap()),
            json!({"user_id": "alice"})
        );
    }

    #[test]
    fn test_params_flatten_extra() {
        let params = MemoryParams::new()
            .with_query("favourite food")
            .with_metadata_entry("source", "chat")
            .with_extra("top_k", 5);

        let map = params.to_map().unwrap();
        assert_eq!(map["query"], json!("favourite food"));
        assert_eq!(map["metadata"], json!({"source": "chat"}));
        assert_eq!(map["top_k"], json!(5));
        assert!(!map.contains_key("extra"));
    }

    #[test]
    fn test_params_typed_fields_win_over_extra() {
        let params = MemoryParams::new()
            .with_user_id("alice")
            .with_metadata_entry("source", "chat")
            .with_extra("user_id", "mallory")
            .with_extra("metadata", json!({"tag": "x"}))
            .with_extra("agent_id", "concierge");

        let map = params.to_map().unwrap();
        assert_eq!(map["user_id"], json!("alice"));
        assert_eq!(map["metadata"], json!({"source": "chat"}));
        // Unset typed fields do not hide extra entries
        assert_eq!(map["agent_id"], json!("concierge"));
    }

    #[test]
    fn test_params_roundtrip_keeps_unknown_keys() {
        let params: MemoryParams =
            serde_json::from_value(json!({"user_id": "u", "filters": {"a": 1}})).unwrap();
        assert_eq!(params.user_id.as_deref(), Some("u"));
        assert_eq!(params.extra["filters"], json!({"a": 1}));
    }
}
