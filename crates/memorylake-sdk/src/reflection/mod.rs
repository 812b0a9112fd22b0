//! Reflection handles.
//!
//! A reflection ties several memory reads and writes to one target (a user
//! or a location) under a shared `reflect_id`. Every request issued through a
//! handle carries the same correlation metadata under
//! `metadata.memorylake_extension`:
//!
//! ```json
//! {
//!   "reflect_id": "<uuid>",
//!   "reflect_target": {"target_type": "user", "target_id": "alice"}
//! }
//! ```
//!
//! Handles hold no server-side state; dropping one releases nothing.

mod blocking;

pub use blocking::BlockingReflection;

use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::issuer::RequestIssuer;
use memorylake_core::{
    MemoryParams, Messages, ReflectTarget, Result, SyncType, TargetType, TelemetryEvent,
};

/// Recollect endpoint
pub const RECOLLECT_PATH: &str = "/v3/memories/recollect/";

/// Metadata key holding the correlation sub-map
pub const EXTENSION_KEY: &str = "memorylake_extension";

// ─────────────────────────────────────────────────────────────────────────────
// Correlation
// ─────────────────────────────────────────────────────────────────────────────

/// Correlation identity shared by both handle variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    reflect_id: Uuid,
    target: ReflectTarget,
}

impl Correlation {
    /// Start a new correlation scope with a fresh v4 id
    pub fn new(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            reflect_id: Uuid::new_v4(),
            target: ReflectTarget::new(target_type, target_id),
        }
    }

    pub fn reflect_id(&self) -> Uuid {
        self.reflect_id
    }

    pub fn target(&self) -> &ReflectTarget {
        &self.target
    }

    /// Stamp `reflect_id` and `reflect_target` into the params' metadata.
    ///
    /// Caller keys inside `memorylake_extension` are kept except the two
    /// correlation keys, which always take this scope's values. Other
    /// metadata keys are untouched. A missing or non-object extension value
    /// is treated as empty.
    ///
    /// Metadata passed through `extra` is folded into the typed map, whose
    /// keys take precedence.
    pub fn stamp(&self, mut params: MemoryParams) -> MemoryParams {
        let mut metadata = match params.extra.remove("metadata") {
            Some(Value::Object(metadata)) => metadata,
            _ => Map::new(),
        };
        if let Some(typed) = params.metadata.take() {
            metadata.extend(typed);
        }

        let mut extension = match metadata.remove(EXTENSION_KEY) {
            Some(Value::Object(extension)) => extension,
            _ => Map::new(),
        };
        extension.insert(
            "reflect_id".into(),
            Value::String(self.reflect_id.to_string()),
        );
        extension.insert(
            "reflect_target".into(),
            json!({
                "target_type": self.target.target_type.as_str(),
                "target_id": self.target.target_id,
            }),
        );

        metadata.insert(EXTENSION_KEY.into(), Value::Object(extension));
        params.metadata = Some(metadata);
        params
    }

    fn recollect_event(&self, sync_type: SyncType) -> TelemetryEvent {
        TelemetryEvent::new("client.recollect", sync_type)
            .with_property("reflect_id", self.reflect_id.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Async handle
// ─────────────────────────────────────────────────────────────────────────────

/// Async reflection handle.
///
/// Cheap to clone; clones share the same `reflect_id`.
#[derive(Clone)]
pub struct Reflection {
    correlation: Correlation,
    issuer: Arc<dyn RequestIssuer>,
}

impl Reflection {
    /// Create a handle issuing requests through `issuer`
    pub fn new(
        target_type: TargetType,
        target_id: impl Into<String>,
        issuer: Arc<dyn RequestIssuer>,
    ) -> Self {
        let correlation = Correlation::new(target_type, target_id);
        debug!(
            "New reflection {} for {} {}",
            correlation.reflect_id, correlation.target.target_type, correlation.target.target_id
        );
        Self {
            correlation,
            issuer,
        }
    }

    pub fn reflect_id(&self) -> Uuid {
        self.correlation.reflect_id
    }

    pub fn target_type(&self) -> TargetType {
        self.correlation.target.target_type
    }

    pub fn target_id(&self) -> &str {
        &self.correlation.target.target_id
    }

    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    /// Query memories relevant to this reflection's target
    pub async fn recollect(&self, params: MemoryParams) -> Result<Value> {
        let params = self.correlation.stamp(params);
        let payload = self.issuer.prepare_params(params.to_map()?)?;
        let response = self.issuer.post(RECOLLECT_PATH, payload).await?;
        self.issuer
            .capture(&self.correlation.recollect_event(SyncType::Async));
        Ok(response)
    }

    /// Store messages tagged with this reflection's correlation metadata
    pub async fn save(&self, messages: impl Into<Messages>, params: MemoryParams) -> Result<Value> {
        let params = self.correlation.stamp(params);
        self.issuer.add(messages.into(), params).await
    }
}

impl std::fmt::Debug for Reflection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reflection")
            .field("correlation", &self.correlation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use memorylake_core::Error;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Issuer recording every call, for both handle variants
    #[derive(Default)]
    pub(crate) struct FakeIssuer {
        pub posts: Mutex<Vec<(String, Map<String, Value>)>>,
        pub adds: Mutex<Vec<(Messages, MemoryParams)>>,
        pub events: Mutex<Vec<TelemetryEvent>>,
        pub fail_with: Option<u16>,
    }

    impl FakeIssuer {
        pub fn failing(status: u16) -> Self {
            Self {
                fail_with: Some(status),
                ..Default::default()
            }
        }

        pub fn do_post(&self, path: &str, payload: Map<String, Value>) -> Result<Value> {
            self.posts.lock().unwrap().push((path.to_string(), payload));
            match self.fail_with {
                Some(status) => Err(Error::api(status, "rejected")),
                None => Ok(json!({"results": [{"memory": "likes tea"}]})),
            }
        }

        pub fn do_add(&self, messages: Messages, params: MemoryParams) -> Result<Value> {
            self.adds.lock().unwrap().push((messages, params));
            match self.fail_with {
                Some(status) => Err(Error::api(status, "rejected")),
                None => Ok(json!({"results": [{"id": "m-1", "event": "ADD"}]})),
            }
        }

        pub fn extension_of(payload: &Map<String, Value>) -> Value {
            payload["metadata"][EXTENSION_KEY].clone()
        }
    }

    #[async_trait]
    impl RequestIssuer for FakeIssuer {
        fn prepare_params(&self, params: Map<String, Value>) -> Result<Map<String, Value>> {
            Ok(params)
        }

        async fn post(&self, path: &str, payload: Map<String, Value>) -> Result<Value> {
            self.do_post(path, payload)
        }

        async fn add(&self, messages: Messages, params: MemoryParams) -> Result<Value> {
            self.do_add(messages, params)
        }

        fn capture(&self, event: &TelemetryEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn extension_map(value: Value) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert(EXTENSION_KEY.into(), value);
        metadata
    }

    // ── Correlation ─────────────────────────────────────────────────────────

    #[test]
    fn test_reflect_ids_are_unique_v4() {
        let ids: HashSet<Uuid> = (0..100)
            .map(|i| Correlation::new(TargetType::User, format!("u-{}", i)).reflect_id())
            .collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.get_version_num() == 4));
    }

    #[test]
    fn test_stamp_without_metadata() {
        let correlation = Correlation::new(TargetType::Location, "loc-9");
        let params = correlation.stamp(MemoryParams::new());

        assert_eq!(
            Value::Object(params.metadata.unwrap()),
            json!({
                EXTENSION_KEY: {
                    "reflect_id": correlation.reflect_id().to_string(),
                    "reflect_target": {"target_type": "location", "target_id": "loc-9"}
                }
            })
        );
    }

    #[test]
    fn test_stamp_keeps_caller_extension_keys() {
        let correlation = Correlation::new(TargetType::User, "alice");
        let params = MemoryParams::new().with_metadata(extension_map(json!({"foo": "bar"})));

        let metadata = correlation.stamp(params).metadata.unwrap();
        assert_eq!(
            metadata[EXTENSION_KEY],
            json!({
                "foo": "bar",
                "reflect_id": correlation.reflect_id().to_string(),
                "reflect_target": {"target_type": "user", "target_id": "alice"}
            })
        );
    }

    #[test]
    fn test_stamp_overwrites_caller_correlation_keys() {
        let correlation = Correlation::new(TargetType::User, "alice");
        let params = MemoryParams::new().with_metadata(extension_map(json!({
            "reflect_id": "caller-value",
            "reflect_target": {"target_type": "location", "target_id": "elsewhere"}
        })));

        let metadata = correlation.stamp(params).metadata.unwrap();
        assert_eq!(
            metadata[EXTENSION_KEY]["reflect_id"],
            json!(correlation.reflect_id().to_string())
        );
        assert_eq!(
            metadata[EXTENSION_KEY]["reflect_target"],
            json!({"target_type": "user", "target_id": "alice"})
        );
    }

    #[test]
    fn test_stamp_keeps_sibling_metadata() {
        let correlation = Correlation::new(TargetType::User, "alice");
        let params = MemoryParams::new()
            .with_metadata_entry("source", "chat")
            .with_metadata_entry("tags", json!(["a", "b"]));

        let metadata = correlation.stamp(params).metadata.unwrap();
        assert_eq!(metadata["source"], json!("chat"));
        assert_eq!(metadata["tags"], json!(["a", "b"]));
        assert!(metadata.contains_key(EXTENSION_KEY));
    }

    #[test]
    fn test_stamp_replaces_non_object_extension() {
        let correlation = Correlation::new(TargetType::User, "alice");
        for bad in [Value::Null, json!("oops"), json!([1, 2])] {
            let params = MemoryParams::new().with_metadata(extension_map(bad));
            let metadata = correlation.stamp(params).metadata.unwrap();
            let extension = metadata[EXTENSION_KEY].as_object().unwrap();
            assert_eq!(extension.len(), 2);
        }
    }

    #[test]
    fn test_stamp_adopts_metadata_from_extra() {
        let correlation = Correlation::new(TargetType::User, "alice");
        let params = MemoryParams::new().with_extra("metadata", json!({"source": "import"}));

        let params = correlation.stamp(params);
        assert!(!params.extra.contains_key("metadata"));
        let metadata = params.metadata.unwrap();
        assert_eq!(metadata["source"], json!("import"));
        assert!(metadata.contains_key(EXTENSION_KEY));
    }

    #[test]
    fn test_stamp_merges_typed_and_extra_metadata() {
        let correlation = Correlation::new(TargetType::User, "alice");
        let params = MemoryParams::new()
            .with_metadata_entry("source", "chat")
            .with_extra("metadata", json!({"tag": "x", "source": "import"}));

        let params = correlation.stamp(params);
        assert!(!params.extra.contains_key("metadata"));
        let metadata = params.metadata.unwrap();
        assert_eq!(metadata["source"], json!("chat"));
        assert_eq!(metadata["tag"], json!("x"));
        assert_eq!(
            metadata[EXTENSION_KEY]["reflect_id"],
            json!(correlation.reflect_id().to_string())
        );
    }

    #[test]
    fn test_stamp_leaves_other_params_alone() {
        let correlation = Correlation::new(TargetType::User, "alice");
        let params = MemoryParams::new()
            .with_user_id("alice")
            .with_query("coffee")
            .with_extra("top_k", 3);

        let stamped = correlation.stamp(params);
        assert_eq!(stamped.user_id.as_deref(), Some("alice"));
        assert_eq!(stamped.query.as_deref(), Some("coffee"));
        assert_eq!(stamped.extra["top_k"], json!(3));
    }

    // ── Async handle ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_recollect_posts_stamped_payload() {
        let issuer = Arc::new(FakeIssuer::default());
        let reflection = Reflection::new(TargetType::User, "alice", issuer.clone());

        let response = reflection
            .recollect(MemoryParams::new().with_query("drinks"))
            .await
            .unwrap();
        assert_eq!(response, json!({"results": [{"memory": "likes tea"}]}));

        let posts = issuer.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, RECOLLECT_PATH);
        assert_eq!(posts[0].1["query"], json!("drinks"));
        assert_eq!(
            FakeIssuer::extension_of(&posts[0].1)["reflect_id"],
            json!(reflection.reflect_id().to_string())
        );

        let events = issuer.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "client.recollect");
        assert_eq!(events[0].sync_type(), Some("async"));
        assert_eq!(
            events[0].properties["reflect_id"],
            json!(reflection.reflect_id().to_string())
        );
    }

    #[tokio::test]
    async fn test_recollect_keeps_correlation_with_extra_metadata() {
        let issuer = Arc::new(FakeIssuer::default());
        let reflection = Reflection::new(TargetType::User, "alice", issuer.clone());

        reflection
            .recollect(
                MemoryParams::new()
                    .with_metadata_entry("source", "chat")
                    .with_extra("metadata", json!({"tag": "x"})),
            )
            .await
            .unwrap();

        let posts = issuer.posts.lock().unwrap();
        let metadata = &posts[0].1["metadata"];
        assert_eq!(metadata["source"], json!("chat"));
        assert_eq!(metadata["tag"], json!("x"));
        assert_eq!(
            metadata[EXTENSION_KEY]["reflect_id"],
            json!(reflection.reflect_id().to_string())
        );
        assert_eq!(
            metadata[EXTENSION_KEY]["reflect_target"],
            json!({"target_type": "user", "target_id": "alice"})
        );
    }

    #[tokio::test]
    async fn test_repeated_recollects_share_correlation() {
        let issuer = Arc::new(FakeIssuer::default());
        let reflection = Reflection::new(TargetType::Location, "loc-1", issuer.clone());

        reflection
            .recollect(MemoryParams::new().with_query("first"))
            .await
            .unwrap();
        reflection
            .recollect(MemoryParams::new().with_user_id("bob").with_metadata_entry("k", "v"))
            .await
            .unwrap();

        let posts = issuer.posts.lock().unwrap();
        let first = FakeIssuer::extension_of(&posts[0].1);
        let second = FakeIssuer::extension_of(&posts[1].1);
        assert_eq!(first["reflect_id"], second["reflect_id"]);
        assert_eq!(first["reflect_target"], second["reflect_target"]);
    }

    #[tokio::test]
    async fn test_recollect_failure_skips_telemetry() {
        let issuer = Arc::new(FakeIssuer::failing(503));
        let reflection = Reflection::new(TargetType::User, "alice", issuer.clone());

        let err = reflection.recollect(MemoryParams::new()).await.unwrap_err();
        assert!(err.is_api_error());
        assert_eq!(err.status(), Some(503));
        assert!(issuer.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_delegates_to_add() {
        let issuer = Arc::new(FakeIssuer::default());
        let reflection = Reflection::new(TargetType::User, "alice", issuer.clone());

        let response = reflection
            .save("likes tea", MemoryParams::new().with_user_id("alice"))
            .await
            .unwrap();
        assert_eq!(response, json!({"results": [{"id": "m-1", "event": "ADD"}]}));

        assert!(issuer.posts.lock().unwrap().is_empty());
        let adds = issuer.adds.lock().unwrap();
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].0, Messages::from("likes tea"));
        let metadata = adds[0].1.metadata.as_ref().unwrap();
        assert_eq!(
            metadata[EXTENSION_KEY]["reflect_target"],
            json!({"target_type": "user", "target_id": "alice"})
        );
    }

    #[tokio::test]
    async fn test_save_propagates_add_error() {
        let issuer = Arc::new(FakeIssuer::failing(400));
        let reflection = Reflection::new(TargetType::User, "alice", issuer.clone());

        let err = reflection.save("x", MemoryParams::new()).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_concurrent_use_from_tasks() {
        let issuer = Arc::new(FakeIssuer::default());
        let reflection = Reflection::new(TargetType::User, "alice", issuer.clone());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reflection = reflection.clone();
                tokio::spawn(async move {
                    reflection
                        .recollect(MemoryParams::new().with_query(format!("q{}", i)))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let posts = issuer.posts.lock().unwrap();
        assert_eq!(posts.len(), 8);
        let expected = json!(reflection.reflect_id().to_string());
        assert!(posts
            .iter()
            .all(|(_, payload)| FakeIssuer::extension_of(payload)["reflect_id"] == expected));
    }
}
