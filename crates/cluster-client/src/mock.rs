//! Mock ClusterClient for unit testing
//!
//! An in-memory implementation of [`ClusterClientTrait`] so reconcilers and
//! sweepers can be tested without an API server. Objects are keyed by
//! `(namespace, name)`. Tests seed state through the `add_*` helpers and
//! assert on performed writes through [`MockClusterClient::write_counts`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use k8s_openapi::api::core::v1::{Pod, Service};
use kube::ResourceExt;

use crds::{Tunnel, TunnelStatus, Unit, UnitStatus, Workspace, WorkspaceStatus};

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;

type Key = (String, String);

/// Counters for the write operations performed against the mock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub creates: u32,
    pub deletes: u32,
    pub status_updates: u32,
}

impl WriteCounts {
    /// Total number of writes of any kind.
    pub fn total(&self) -> u32 {
        self.creates + self.deletes + self.status_updates
    }
}

/// Mock cluster client for testing
///
/// Clones share the same underlying stores, so a test can keep a handle
/// while the code under test owns another.
#[derive(Clone, Default)]
pub struct MockClusterClient {
    pub(crate) workspaces: Arc<Mutex<HashMap<Key, Workspace>>>,
    pub(crate) units: Arc<Mutex<HashMap<Key, Unit>>>,
    pub(crate) tunnels: Arc<Mutex<HashMap<Key, Tunnel>>>,
    pub(crate) pods: Arc<Mutex<HashMap<Key, Pod>>>,
    pub(crate) services: Arc<Mutex<HashMap<Key, Service>>>,
    pub(crate) writes: Arc<Mutex<WriteCounts>>,
}

impl MockClusterClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a workspace to the mock store (for test setup)
    pub fn add_workspace(&self, workspace: Workspace) {
        let key = (workspace.namespace().unwrap_or_default(), workspace.name_any());
        self.workspaces.lock().unwrap().insert(key, workspace);
    }

    /// Add a unit to the mock store (for test setup)
    pub fn add_unit(&self, unit: Unit) {
        let key = (unit.namespace().unwrap_or_default(), unit.name_any());
        self.units.lock().unwrap().insert(key, unit);
    }

    /// Add a tunnel to the mock store (for test setup)
    pub fn add_tunnel(&self, tunnel: Tunnel) {
        let key = (tunnel.namespace().unwrap_or_default(), tunnel.name_any());
        self.tunnels.lock().unwrap().insert(key, tunnel);
    }

    /// Add a pod to the mock store (for test setup)
    pub fn add_pod(&self, pod: Pod) {
        let key = (pod.namespace().unwrap_or_default(), pod.name_any());
        self.pods.lock().unwrap().insert(key, pod);
    }

    /// Add a service to the mock store (for test setup)
    pub fn add_service(&self, service: Service) {
        let key = (service.namespace().unwrap_or_default(), service.name_any());
        self.services.lock().unwrap().insert(key, service);
    }

    /// Snapshot of the write counters
    pub fn write_counts(&self) -> WriteCounts {
        *self.writes.lock().unwrap()
    }

    /// Reset the write counters, e.g. between two reconcile passes
    pub fn reset_write_counts(&self) {
        *self.writes.lock().unwrap() = WriteCounts::default();
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    // Workspace operations

    async fn get_workspace(&self, namespace: &str, name: &str) -> Result<Workspace, ClusterError> {
        self.workspaces
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Workspace {}/{}", namespace, name)))
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ClusterError> {
        Ok(self.workspaces.lock().unwrap().values().cloned().collect())
    }

    async fn delete_workspace(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let removed = self
            .workspaces
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        if removed.is_none() {
            return Err(ClusterError::NotFound(format!(
                "Workspace {}/{}",
                namespace, name
            )));
        }
        self.writes.lock().unwrap().deletes += 1;
        Ok(())
    }

    async fn update_workspace_status(
        &self,
        namespace: &str,
        name: &str,
        status: &WorkspaceStatus,
    ) -> Result<(), ClusterError> {
        let mut workspaces = self.workspaces.lock().unwrap();
        let workspace = workspaces
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClusterError::NotFound(format!("Workspace {}/{}", namespace, name)))?;
        workspace.status = Some(status.clone());
        drop(workspaces);
        self.writes.lock().unwrap().status_updates += 1;
        Ok(())
    }

    // Unit operations

    async fn get_unit(&self, namespace: &str, name: &str) -> Result<Unit, ClusterError> {
        self.units
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Unit {}/{}", namespace, name)))
    }

    async fn list_units(&self) -> Result<Vec<Unit>, ClusterError> {
        Ok(self.units.lock().unwrap().values().cloned().collect())
    }

    async fn create_unit(&self, unit: &Unit) -> Result<Unit, ClusterError> {
        let key = (unit.namespace().unwrap_or_default(), unit.name_any());
        let mut units = self.units.lock().unwrap();
        if units.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(format!(
                "Unit {}/{}",
                key.0, key.1
            )));
        }
        units.insert(key, unit.clone());
        drop(units);
        self.writes.lock().unwrap().creates += 1;
        Ok(unit.clone())
    }

    async fn delete_unit(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let removed = self
            .units
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        if removed.is_none() {
            return Err(ClusterError::NotFound(format!("Unit {}/{}", namespace, name)));
        }
        self.writes.lock().unwrap().deletes += 1;
        Ok(())
    }

    async fn update_unit_status(
        &self,
        namespace: &str,
        name: &str,
        status: &UnitStatus,
    ) -> Result<(), ClusterError> {
        let mut units = self.units.lock().unwrap();
        let unit = units
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClusterError::NotFound(format!("Unit {}/{}", namespace, name)))?;
        unit.status = Some(status.clone());
        drop(units);
        self.writes.lock().unwrap().status_updates += 1;
        Ok(())
    }

    // Tunnel operations

    async fn get_tunnel(&self, namespace: &str, name: &str) -> Result<Tunnel, ClusterError> {
        self.tunnels
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Tunnel {}/{}", namespace, name)))
    }

    async fn list_tunnels(&self) -> Result<Vec<Tunnel>, ClusterError> {
        Ok(self.tunnels.lock().unwrap().values().cloned().collect())
    }

    async fn create_tunnel(&self, tunnel: &Tunnel) -> Result<Tunnel, ClusterError> {
        let key = (tunnel.namespace().unwrap_or_default(), tunnel.name_any());
        let mut tunnels = self.tunnels.lock().unwrap();
        if tunnels.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(format!(
                "Tunnel {}/{}",
                key.0, key.1
            )));
        }
        tunnels.insert(key, tunnel.clone());
        drop(tunnels);
        self.writes.lock().unwrap().creates += 1;
        Ok(tunnel.clone())
    }

    async fn delete_tunnel(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let removed = self
            .tunnels
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        if removed.is_none() {
            return Err(ClusterError::NotFound(format!(
                "Tunnel {}/{}",
                namespace, name
            )));
        }
        self.writes.lock().unwrap().deletes += 1;
        Ok(())
    }

    async fn update_tunnel_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TunnelStatus,
    ) -> Result<(), ClusterError> {
        let mut tunnels = self.tunnels.lock().unwrap();
        let tunnel = tunnels
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClusterError::NotFound(format!("Tunnel {}/{}", namespace, name)))?;
        tunnel.status = Some(status.clone());
        drop(tunnels);
        self.writes.lock().unwrap().status_updates += 1;
        Ok(())
    }

    // Pod operations

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError> {
        self.pods
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Pod {}/{}", namespace, name)))
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Pod, ClusterError> {
        let key = (pod.namespace().unwrap_or_default(), pod.name_any());
        let mut pods = self.pods.lock().unwrap();
        if pods.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(format!(
                "Pod {}/{}",
                key.0, key.1
            )));
        }
        pods.insert(key, pod.clone());
        drop(pods);
        self.writes.lock().unwrap().creates += 1;
        Ok(pod.clone())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let removed = self
            .pods
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        if removed.is_none() {
            return Err(ClusterError::NotFound(format!("Pod {}/{}", namespace, name)));
        }
        self.writes.lock().unwrap().deletes += 1;
        Ok(())
    }

    // Service operations

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError> {
        self.services
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Service {}/{}", namespace, name)))
    }

    async fn create_service(&self, service: &Service) -> Result<Service, ClusterError> {
        let key = (service.namespace().unwrap_or_default(), service.name_any());
        let mut services = self.services.lock().unwrap();
        if services.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(format!(
                "Service {}/{}",
                key.0, key.1
            )));
        }
        services.insert(key, service.clone());
        drop(services);
        self.writes.lock().unwrap().creates += 1;
        Ok(service.clone())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let removed = self
            .services
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        if removed.is_none() {
            return Err(ClusterError::NotFound(format!(
                "Service {}/{}",
                namespace, name
            )));
        }
        self.writes.lock().unwrap().deletes += 1;
        Ok(())
    }
}
