//! Control plane for the Agentic RAG platform
//!
//! Owns the process lifecycle: configuration, logging, storage backend
//! selection and the session sweeper.

pub mod app;
pub mod telemetry;

pub use app::{AppState, ControlPlane};
pub use telemetry::{init_telemetry, TelemetryConfig};
