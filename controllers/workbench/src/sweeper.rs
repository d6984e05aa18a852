//! Periodic lifecycle sweeps
//!
//! The watchers react to individual object events; the sweeper levels
//! everything that has no event edge: TTL expiry, status propagation up
//! the chain (Pod -> Unit -> Workspace, Service -> Tunnel), and the
//! periodic port map rebuild.
//!
//! One failed object never stops a sweep pass; failures are logged and the
//! pass moves on to the next object.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition as K8sCondition;
use kube::ResourceExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use cluster_client::ClusterClientTrait;
use crds::{Condition, TunnelStatus, UnitStatus, WorkspaceStatus};

use crate::error::ControllerError;
use crate::ports::PortMap;

/// Interval of the workspace sweep (TTL expiry + unit phase mirroring).
pub const WORKSPACE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Interval of the unit sweep (TTL expiry + pod phase mirroring).
pub const UNIT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Interval of the tunnel sweep (service condition mirroring).
pub const TUNNEL_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Interval of the port map rebuild.
pub const PORT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic sweeps over the whole resource population.
pub struct Sweeper {
    client: Arc<dyn ClusterClientTrait>,
    ports: Arc<PortMap>,
}

impl Sweeper {
    /// Creates a new sweeper instance.
    pub fn new(client: Arc<dyn ClusterClientTrait>, ports: Arc<PortMap>) -> Self {
        Self { client, ports }
    }

    /// True when an object created at `created` with a TTL of `days` has
    /// expired at `now`. Zero days means no expiry; the boundary instant
    /// itself counts as expired.
    pub(crate) fn expired(created: DateTime<Utc>, days: u32, now: DateTime<Utc>) -> bool {
        if days == 0 {
            return false;
        }
        now - created >= chrono::Duration::days(i64::from(days))
    }

    /// One pass over all workspaces: delete the expired ones, mirror the
    /// unit phase into workspace status for the rest.
    pub async fn sweep_workspaces(&self) -> Result<(), ControllerError> {
        let workspaces = self.client.list_workspaces().await?;
        debug!("Sweeping {} workspaces", workspaces.len());
        let now = Utc::now();

        for workspace in &workspaces {
            let namespace = workspace.namespace().unwrap_or_default();
            let name = workspace.name_any();

            if let Some(created) = &workspace.metadata.creation_timestamp {
                if Self::expired(created.0, workspace.spec.days, now) {
                    info!("Workspace {}/{} expired, deleting", namespace, name);
                    if let Err(e) = self.client.delete_workspace(&namespace, &name).await {
                        if !e.is_not_found() {
                            error!(
                                "Failed to delete expired Workspace {}/{}: {}",
                                namespace, name, e
                            );
                        }
                    }
                    continue;
                }
            }

            // Mirror the unit phase; an absent unit is the reconciler's
            // problem, not the sweeper's
            let unit = match self.client.get_unit(&namespace, &name).await {
                Ok(unit) => unit,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!("Failed to read Unit {}/{}: {}", namespace, name, e);
                    continue;
                }
            };
            let unit_phase = unit.status.as_ref().and_then(|s| s.phase.clone());
            let workspace_phase = workspace.status.as_ref().and_then(|s| s.phase.clone());
            if unit_phase != workspace_phase {
                let status = WorkspaceStatus {
                    phase: unit_phase,
                    node_port: workspace.status.as_ref().and_then(|s| s.node_port),
                };
                if let Err(e) = self
                    .client
                    .update_workspace_status(&namespace, &name, &status)
                    .await
                {
                    warn!(
                        "Failed to update Workspace {}/{} status: {}",
                        namespace, name, e
                    );
                }
            }
        }

        Ok(())
    }

    /// One pass over all units: delete the expired ones, mirror the pod
    /// phase into unit status for the rest.
    pub async fn sweep_units(&self) -> Result<(), ControllerError> {
        let units = self.client.list_units().await?;
        debug!("Sweeping {} units", units.len());
        let now = Utc::now();

        for unit in &units {
            let namespace = unit.namespace().unwrap_or_default();
            let name = unit.name_any();

            if !unit.spec.lifecycle.forever {
                if let Some(created) = &unit.metadata.creation_timestamp {
                    if Self::expired(created.0, unit.spec.lifecycle.days, now) {
                        info!("Unit {}/{} expired, deleting", namespace, name);
                        if let Err(e) = self.client.delete_unit(&namespace, &name).await {
                            if !e.is_not_found() {
                                error!(
                                    "Failed to delete expired Unit {}/{}: {}",
                                    namespace, name, e
                                );
                            }
                        }
                        continue;
                    }
                }
            }

            let pod = match self.client.get_pod(&namespace, &name).await {
                Ok(pod) => pod,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!("Failed to read Pod {}/{}: {}", namespace, name, e);
                    continue;
                }
            };
            let pod_phase = pod.status.as_ref().and_then(|s| s.phase.clone());
            let unit_phase = unit.status.as_ref().and_then(|s| s.phase.clone());
            if pod_phase != unit_phase {
                let status = UnitStatus { phase: pod_phase };
                if let Err(e) = self.client.update_unit_status(&namespace, &name, &status).await {
                    warn!("Failed to update Unit {}/{} status: {}", namespace, name, e);
                }
            }
        }

        Ok(())
    }

    /// One pass over all tunnels: mirror the service conditions into tunnel
    /// status.
    pub async fn sweep_tunnels(&self) -> Result<(), ControllerError> {
        let tunnels = self.client.list_tunnels().await?;
        debug!("Sweeping {} tunnels", tunnels.len());

        for tunnel in &tunnels {
            let namespace = tunnel.namespace().unwrap_or_default();
            let name = tunnel.name_any();

            let service = match self.client.get_service(&namespace, &name).await {
                Ok(service) => service,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!("Failed to read Service {}/{}: {}", namespace, name, e);
                    continue;
                }
            };

            let conditions: Vec<Condition> = service
                .status
                .as_ref()
                .and_then(|s| s.conditions.as_ref())
                .map(|conditions| conditions.iter().map(convert_condition).collect())
                .unwrap_or_default();
            let current = tunnel
                .status
                .as_ref()
                .map(|s| s.conditions.clone())
                .unwrap_or_default();
            if conditions != current {
                let status = TunnelStatus { conditions };
                if let Err(e) = self
                    .client
                    .update_tunnel_status(&namespace, &name, &status)
                    .await
                {
                    warn!(
                        "Failed to update Tunnel {}/{} status: {}",
                        namespace, name, e
                    );
                }
            }
        }

        Ok(())
    }

    /// Rebuild the port map from the set of existing tunnels. The rebuild
    /// clears the map first, so ports of deleted tunnels come back to the
    /// pool in the same pass.
    pub async fn refresh_ports(&self) -> Result<(), ControllerError> {
        let tunnels = self.client.list_tunnels().await?;
        let used: Vec<i32> = tunnels
            .iter()
            .flat_map(|t| t.spec.ports.iter().map(|p| p.node_port))
            .collect();
        debug!(
            "Rebuilding port map from {} tunnels ({} ports)",
            tunnels.len(),
            used.len()
        );
        self.ports.rebuild(&used);
        Ok(())
    }

    /// Run the workspace sweep until shutdown.
    pub async fn run_workspace_sweep(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(WORKSPACE_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_workspaces().await {
                        error!("Workspace sweep failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Workspace sweep stopped");
                    return;
                }
            }
        }
    }

    /// Run the unit sweep until shutdown.
    pub async fn run_unit_sweep(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(UNIT_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_units().await {
                        error!("Unit sweep failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Unit sweep stopped");
                    return;
                }
            }
        }
    }

    /// Run the tunnel sweep until shutdown.
    pub async fn run_tunnel_sweep(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(TUNNEL_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_tunnels().await {
                        error!("Tunnel sweep failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Tunnel sweep stopped");
                    return;
                }
            }
        }
    }

    /// Run the port map refresh until shutdown.
    pub async fn run_port_refresh(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(PORT_REFRESH_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_ports().await {
                        error!("Port map refresh failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Port map refresh stopped");
                    return;
                }
            }
        }
    }
}

/// Shape a Kubernetes meta/v1 condition into the tunnel status form.
fn convert_condition(condition: &K8sCondition) -> Condition {
    Condition {
        type_: condition.type_.clone(),
        status: condition.status.clone(),
        reason: (!condition.reason.is_empty()).then(|| condition.reason.clone()),
        message: (!condition.message.is_empty()).then(|| condition.message.clone()),
        last_transition_time: Some(condition.last_transition_time.0),
        observed_generation: condition.observed_generation,
    }
}
