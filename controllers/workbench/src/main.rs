//! Workbench Controller
//!
//! Unified controller for the workspace provisioning chain:
//! - Workspace: user-facing request for a dev environment
//! - Unit: workload description derived from a Workspace
//! - Tunnel: NodePort exposure for a Unit
//!
//! Reconciles the chain down into Pods and NodePort Services, sweeps
//! expired objects, and keeps the shared node-port map in sync with the
//! Tunnels that exist in the cluster.

mod controller;
mod error;
mod ports;
mod reconciler;
mod sweeper;
#[cfg(test)]
mod test_utils;
mod watcher;

use controller::Controller;
use crate::error::ControllerError;
use tracing::info;
use std::env;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Workbench Controller");

    // Load configuration from environment variables
    let registry = env::var("IMAGE_REGISTRY")
        .unwrap_or_else(|_| "ghcr.io/microscaler".to_string())
        .trim_end_matches('/')
        .to_string();
    if registry.is_empty() {
        return Err(ControllerError::InvalidConfig(
            "IMAGE_REGISTRY must not be empty".to_string(),
        ));
    }
    let data_root = env::var("DATA_ROOT")
        .unwrap_or_else(|_| "/data".to_string())
        .trim_end_matches('/')
        .to_string();
    let namespace = env::var("WATCH_NAMESPACE").ok();

    info!("Configuration:");
    info!("  Image registry: {}", registry);
    info!("  Data root: {}", data_root);
    info!("  Namespace: {}", namespace.as_deref().unwrap_or("all namespaces"));

    // Initialize and run controller
    let controller = Controller::new(registry, data_root, namespace).await?;
    controller.run().await?;

    Ok(())
}
