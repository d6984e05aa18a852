//! Controller-specific error types.
//!
//! This module defines error types specific to the Workbench Controller
//! that are not covered by upstream library errors.

use thiserror::Error;
use cluster_client::ClusterError;
use kube::Error as KubeError;

/// Errors that can occur in the Workbench Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error through the cluster client
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Kubernetes client error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// The node-port range has no free port left
    #[error("Node port pool exhausted: {0}")]
    PortPoolExhausted(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
