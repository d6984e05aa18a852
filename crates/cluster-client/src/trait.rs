//! ClusterClient trait for mocking
//!
//! This trait abstracts the Kubernetes API operations the controllers use,
//! so reconcilers and sweepers can be unit tested against an in-memory
//! implementation. The concrete [`crate::ClusterClient`] implements it over
//! a real API server.

use k8s_openapi::api::core::v1::{Pod, Service};

use crds::{Tunnel, TunnelStatus, Unit, UnitStatus, Workspace, WorkspaceStatus};

use crate::error::ClusterError;

/// Trait for the cluster operations of the Workbench controllers
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime. `get_*` on an absent object returns [`ClusterError::NotFound`];
/// callers branch on it instead of treating it as a failure.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    // Workspace operations
    async fn get_workspace(&self, namespace: &str, name: &str) -> Result<Workspace, ClusterError>;
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ClusterError>;
    async fn delete_workspace(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
    async fn update_workspace_status(
        &self,
        namespace: &str,
        name: &str,
        status: &WorkspaceStatus,
    ) -> Result<(), ClusterError>;

    // Unit operations
    async fn get_unit(&self, namespace: &str, name: &str) -> Result<Unit, ClusterError>;
    async fn list_units(&self) -> Result<Vec<Unit>, ClusterError>;
    async fn create_unit(&self, unit: &Unit) -> Result<Unit, ClusterError>;
    async fn delete_unit(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
    async fn update_unit_status(
        &self,
        namespace: &str,
        name: &str,
        status: &UnitStatus,
    ) -> Result<(), ClusterError>;

    // Tunnel operations
    async fn get_tunnel(&self, namespace: &str, name: &str) -> Result<Tunnel, ClusterError>;
    async fn list_tunnels(&self) -> Result<Vec<Tunnel>, ClusterError>;
    async fn create_tunnel(&self, tunnel: &Tunnel) -> Result<Tunnel, ClusterError>;
    async fn delete_tunnel(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
    async fn update_tunnel_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TunnelStatus,
    ) -> Result<(), ClusterError>;

    // Pod operations
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError>;
    async fn create_pod(&self, pod: &Pod) -> Result<Pod, ClusterError>;
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    // Service operations
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError>;
    async fn create_service(&self, service: &Service) -> Result<Service, ClusterError>;
    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}
