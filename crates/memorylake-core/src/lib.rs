//! memorylake-core - Core library for MemoryLake
//!
//! This crate provides the base memory API client the extension layer builds on:
//!
//! - **config**: Client configuration (file, environment, defaults)
//! - **client**: Async and blocking memory clients over HTTP transports
//! - **telemetry**: Client event sinks
//! - **types**: Request parameters, messages and reflection targets

pub mod client;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use client::{BlockingMemoryClient, MemoryClient};
pub use config::{ClientConfig, ConfigValidationError};
pub use error::{Error, Result};
pub use telemetry::{NoopTelemetry, SyncType, TelemetryEvent, TelemetrySink, TracingTelemetry};
pub use types::{MemoryParams, Message, Messages, ReflectTarget, TargetType};
