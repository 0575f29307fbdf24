// Logging setup for the control plane
// Decision: Console output only, filtered through RUST_LOG

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when RUST_LOG is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "agentic_storage=info,agentic_control_plane=info";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log filter (e.g., "info", "agentic_storage=debug")
    pub log_filter: Option<String>,
    /// Include the event target in each line
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "agentic-control-plane".to_string(),
            log_filter: None,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// - `SERVICE_NAME`: Service name (default: "agentic-control-plane")
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    pub fn from_env() -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "agentic-control-plane".to_string()),
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
            with_target: true,
        }
    }

    /// Directives to install; invalid or missing filters fall back to [`DEFAULT_LOG_FILTER`]
    pub fn directives(&self) -> &str {
        match self.log_filter.as_deref() {
            Some(f) if EnvFilter::try_new(f).is_ok() => f,
            _ => DEFAULT_LOG_FILTER,
        }
    }

    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::new(self.directives())
    }
}

/// Install the global subscriber; call once at startup
pub fn init_telemetry(config: &TelemetryConfig) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(config.with_target)
        .with_filter(config.env_filter());

    tracing_subscriber::registry().with(console_layer).init();

    tracing::debug!(service = %config.service_name, "logging initialized");
}
