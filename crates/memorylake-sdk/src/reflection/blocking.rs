//! Blocking reflection handle.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{Correlation, RECOLLECT_PATH};
use crate::issuer::BlockingRequestIssuer;
use memorylake_core::{MemoryParams, Messages, Result, SyncType, TargetType};

/// Blocking reflection handle.
///
/// Same correlation behavior as [`super::Reflection`]; requests block the
/// calling thread.
#[derive(Clone)]
pub struct BlockingReflection {
    correlation: Correlation,
    issuer: Arc<dyn BlockingRequestIssuer>,
}

impl BlockingReflection {
    /// Create a handle issuing requests through `issuer`
    pub fn new(
        target_type: TargetType,
        target_id: impl Into<String>,
        issuer: Arc<dyn BlockingRequestIssuer>,
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
    pub fn recollect(&self, params: MemoryParams) -> Result<Value> {
        let params = self.correlation.stamp(params);
        let payload = self.issuer.prepare_params(params.to_map()?)?;
        let response = self.issuer.post(RECOLLECT_PATH, payload)?;
        self.issuer
            .capture(&self.correlation.recollect_event(SyncType::Sync));
        Ok(response)
    }

    /// Store messages tagged with this reflection's correlation metadata
    pub fn save(&self, messages: impl Into<Messages>, params: MemoryParams) -> Result<Value> {
        let params = self.correlation.stamp(params);
        self.issuer.add(messages.into(), params)
    }
}

impl std::fmt::Debug for BlockingReflection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingReflection")
            .field("correlation", &self.correlation)
            .finish_non_exhaustive()
    }
}
