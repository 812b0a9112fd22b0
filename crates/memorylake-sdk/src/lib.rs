//! MemoryLake SDK
//!
//! Extends the base memory client from `memorylake-core` with:
//!
//! - **extension** - chat session events and the reflection factory
//! - **reflection** - handles that tag memory reads and writes with a shared
//!   correlation id and a user/location target
//! - **issuer** - the request capabilities reflections are built on
//!
//! Every operation comes in an async and a blocking flavor with identical
//! payloads.
//!
//! # Example
//!
//! ```rust,no_run
//! use memorylake_sdk::{ClientConfig, MemoryLakeClient, MemoryParams, TargetType};
//!
//! async fn example() -> memorylake_sdk::Result<()> {
//!     let client = MemoryLakeClient::new(ClientConfig::new("ml-key"))?;
//!
//!     let reflection = client.new_reflection(TargetType::User, "alice");
//!     let context = reflection
//!         .recollect(MemoryParams::new().with_query("travel preferences"))
//!         .await?;
//!     reflection
//!         .save("Prefers window seats", MemoryParams::new().with_user_id("alice"))
//!         .await?;
//!
//!     client.end_session_now("sess-42").await?;
//!     Ok(())
//! }
//! ```

pub mod extension;
pub mod issuer;
pub mod reflection;

pub use extension::{BlockingMemoryLakeClient, MemoryLakeClient};
pub use issuer::{BlockingRequestIssuer, RequestIssuer};
pub use reflection::{BlockingReflection, Correlation, Reflection};

// ─────────────────────────────────────────────────────────────────────────────
// Re-export core types
// ─────────────────────────────────────────────────────────────────────────────

pub use memorylake_core::{
    ClientConfig, Error, MemoryParams, Message, Messages, NoopTelemetry, ReflectTarget, Result,
    SyncType, TargetType, TelemetryEvent, TelemetrySink, TracingTelemetry,
};

/// Base memory clients and HTTP transports
pub use memorylake_core::client;

/// Client configuration
pub use memorylake_core::config;
