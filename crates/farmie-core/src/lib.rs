pub mod config;
pub mod error;
pub mod workflow_state;

pub use config::{AuthConfig, Config, ConfigIssue, ServiceConfig, ValidationResult, WeatherConfig};
pub use error::{ErrorKind, FarmieError, ReqwestErrorExt};
pub use workflow_state::WorkflowState;

use anyhow::Result;

/// Initialize logging for the host process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Farmie core initialized");
    Ok(())
}
