//! Kubernetes API client
//!
//! Implements the cluster operations over per-call `kube::Api` handles so a
//! single client serves every namespace the controllers touch. Status writes
//! go through merge patches on the status subresource.

use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use crds::{Tunnel, TunnelStatus, Unit, UnitStatus, Workspace, WorkspaceStatus};

use crate::cluster_trait::ClusterClientTrait;
use crate::error::{classify, ClusterError};

/// Kubernetes API client for the Workbench controllers
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
    namespace: Option<String>,
}

impl ClusterClient {
    /// Create a new cluster client
    ///
    /// # Arguments
    /// * `client` - the underlying kube client
    /// * `namespace` - narrows list operations to one namespace; `None`
    ///   lists across the whole cluster
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn workspaces_list_api(&self) -> Api<Workspace> {
        match self.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn units_list_api(&self) -> Api<Unit> {
        match self.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn tunnels_list_api(&self) -> Api<Tunnel> {
        match self.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for ClusterClient {
    // Workspace operations

    async fn get_workspace(&self, namespace: &str, name: &str) -> Result<Workspace, ClusterError> {
        let api: Api<Workspace> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, format!("Workspace {}/{}", namespace, name)))
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ClusterError> {
        let list = self
            .workspaces_list_api()
            .list(&ListParams::default())
            .await
            .map_err(|e| classify(e, "Workspace list".to_string()))?;
        Ok(list.items)
    }

    async fn delete_workspace(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        debug!("Deleting Workspace {}/{}", namespace, name);
        let api: Api<Workspace> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Workspace {}/{}", namespace, name)))
    }

    async fn update_workspace_status(
        &self,
        namespace: &str,
        name: &str,
        status: &WorkspaceStatus,
    ) -> Result<(), ClusterError> {
        debug!("Updating status of Workspace {}/{}", namespace, name);
        let api: Api<Workspace> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Workspace {}/{}", namespace, name)))
    }

    // Unit operations

    async fn get_unit(&self, namespace: &str, name: &str) -> Result<Unit, ClusterError> {
        let api: Api<Unit> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, format!("Unit {}/{}", namespace, name)))
    }

    async fn list_units(&self) -> Result<Vec<Unit>, ClusterError> {
        let list = self
            .units_list_api()
            .list(&ListParams::default())
            .await
            .map_err(|e| classify(e, "Unit list".to_string()))?;
        Ok(list.items)
    }

    async fn create_unit(&self, unit: &Unit) -> Result<Unit, ClusterError> {
        let namespace = unit.namespace().unwrap_or_default();
        let name = unit.name_any();
        debug!("Creating Unit {}/{}", namespace, name);
        let api: Api<Unit> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), unit)
            .await
            .map_err(|e| classify(e, format!("Unit {}/{}", namespace, name)))
    }

    async fn delete_unit(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        debug!("Deleting Unit {}/{}", namespace, name);
        let api: Api<Unit> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Unit {}/{}", namespace, name)))
    }

    async fn update_unit_status(
        &self,
        namespace: &str,
        name: &str,
        status: &UnitStatus,
    ) -> Result<(), ClusterError> {
        debug!("Updating status of Unit {}/{}", namespace, name);
        let api: Api<Unit> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Unit {}/{}", namespace, name)))
    }

    // Tunnel operations

    async fn get_tunnel(&self, namespace: &str, name: &str) -> Result<Tunnel, ClusterError> {
        let api: Api<Tunnel> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, format!("Tunnel {}/{}", namespace, name)))
    }

    async fn list_tunnels(&self) -> Result<Vec<Tunnel>, ClusterError> {
        let list = self
            .tunnels_list_api()
            .list(&ListParams::default())
            .await
            .map_err(|e| classify(e, "Tunnel list".to_string()))?;
        Ok(list.items)
    }

    async fn create_tunnel(&self, tunnel: &Tunnel) -> Result<Tunnel, ClusterError> {
        let namespace = tunnel.namespace().unwrap_or_default();
        let name = tunnel.name_any();
        debug!("Creating Tunnel {}/{}", namespace, name);
        let api: Api<Tunnel> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), tunnel)
            .await
            .map_err(|e| classify(e, format!("Tunnel {}/{}", namespace, name)))
    }

    async fn delete_tunnel(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        debug!("Deleting Tunnel {}/{}", namespace, name);
        let api: Api<Tunnel> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Tunnel {}/{}", namespace, name)))
    }

    async fn update_tunnel_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TunnelStatus,
    ) -> Result<(), ClusterError> {
        debug!("Updating status of Tunnel {}/{}", namespace, name);
        let api: Api<Tunnel> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Tunnel {}/{}", namespace, name)))
    }

    // Pod operations

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, format!("Pod {}/{}", namespace, name)))
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, ClusterError> {
        let namespace = pod.namespace().unwrap_or_default();
        let name = pod.name_any();
        debug!("Creating Pod {}/{}", namespace, name);
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), pod)
            .await
            .map_err(|e| classify(e, format!("Pod {}/{}", namespace, name)))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        debug!("Deleting Pod {}/{}", namespace, name);
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Pod {}/{}", namespace, name)))
    }

    // Service operations

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, format!("Service {}/{}", namespace, name)))
    }

    async fn create_service(&self, service: &Service) -> Result<Service, ClusterError> {
        let namespace = service.namespace().unwrap_or_default();
        let name = service.name_any();
        debug!("Creating Service {}/{}", namespace, name);
        let api: Api<Service> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), service)
            .await
            .map_err(|e| classify(e, format!("Service {}/{}", namespace, name)))
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        debug!("Deleting Service {}/{}", namespace, name);
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("Service {}/{}", namespace, name)))
    }
}
