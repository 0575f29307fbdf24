// Agentic control plane
// Decision: Storage backend and session lifetimes come from the environment (.env supported)
// Decision: Runs until Ctrl+C, then stops the session sweeper before exiting

use agentic_control_plane::{init_telemetry, ControlPlane, TelemetryConfig};
use agentic_storage::{SessionConfig, StorageConfig};
use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Configure via environment variables:
    // - RUST_LOG: Log filter (default: "agentic_storage=info,agentic_control_plane=info")
    // - STORAGE_BACKEND: "memory" (default) or "postgres"
    // - DATABASE_URL / DATABASE_MAX_CONNECTIONS: PostgreSQL connection
    // - SESSION_TTL_SECS / SESSION_SWEEP_INTERVAL_SECS: session lifetimes
    let telemetry_config = TelemetryConfig::from_env();
    init_telemetry(&telemetry_config);

    tracing::info!(
        service = %telemetry_config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let storage_config = StorageConfig::from_env();
    let session_config = SessionConfig::from_env();

    let control_plane = ControlPlane::start(&storage_config, &session_config)
        .await
        .context("Failed to start control plane")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    control_plane.shutdown().await;
    Ok(())
}
