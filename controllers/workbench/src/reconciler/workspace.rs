//! Workspace reconciler
//!
//! Converges one Workspace into its derived Unit and Tunnel. The Tunnel
//! branch is where the shared node port gets taken, so a full port pool
//! aborts this reconcile before anything is created.

use kube::ResourceExt;
use tracing::{error, info, warn};

use crds::{
    unit_id, Execution, GpuPolicy, Lifecycle, Protocol, ResourceQuota, Tunnel, TunnelPort,
    TunnelSpec, Unit, UnitSpec, Workspace, WorkspaceStatus,
};

use super::Reconciler;
use crate::error::ControllerError;

impl Reconciler {
    /// Reconcile one workspace by identity.
    ///
    /// An absent or terminating workspace tears down the derived Unit and
    /// Tunnel; a live one gets both created if missing. The node port is
    /// written into the workspace status right after the Tunnel create.
    pub async fn reconcile_workspace(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ControllerError> {
        info!("Reconciling Workspace {}/{}", namespace, name);

        let workspace = match self.client.get_workspace(namespace, name).await {
            Ok(workspace) => workspace,
            Err(e) if e.is_not_found() => {
                info!(
                    "Workspace {}/{} is gone, removing derived objects",
                    namespace, name
                );
                self.delete_workspace_children(namespace, name).await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // A deletion timestamp means the workspace is on its way out; treat
        // it like an absent parent.
        if workspace.metadata.deletion_timestamp.is_some() {
            info!(
                "Workspace {}/{} is terminating, removing derived objects",
                namespace, name
            );
            self.delete_workspace_children(namespace, name).await;
            return Ok(());
        }

        // Ensure the Unit exists
        match self.client.get_unit(namespace, name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                let unit = generate_unit(&workspace);
                info!("Creating Unit {}/{}", namespace, name);
                match self.client.create_unit(&unit).await {
                    Ok(_) => {}
                    // Lost a benign race against another reconcile
                    Err(e) if e.is_already_exists() => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        // Ensure the Tunnel exists; this is where the node port gets taken
        match self.client.get_tunnel(namespace, name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                let node_port = self.ports.allocate().ok_or_else(|| {
                    ControllerError::PortPoolExhausted(format!(
                        "no free node port for Tunnel {}/{}",
                        namespace, name
                    ))
                })?;
                let tunnel = generate_tunnel(&workspace, node_port);
                info!(
                    "Creating Tunnel {}/{} with node port {}",
                    namespace, name, node_port
                );
                match self.client.create_tunnel(&tunnel).await {
                    Ok(_) => {
                        self.ports.mark_used(node_port);
                        let status = WorkspaceStatus {
                            phase: workspace.status.as_ref().and_then(|s| s.phase.clone()),
                            node_port: Some(node_port),
                        };
                        if let Err(e) = self
                            .client
                            .update_workspace_status(namespace, name, &status)
                            .await
                        {
                            warn!(
                                "Failed to record node port on Workspace {}/{}: {}",
                                namespace, name, e
                            );
                        }
                    }
                    Err(e) if e.is_already_exists() => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    /// Best-effort removal of the Unit and Tunnel derived from a workspace.
    /// Absence is fine, and a failure on one child does not stop the other
    /// delete.
    async fn delete_workspace_children(&self, namespace: &str, name: &str) {
        if let Err(e) = self.client.delete_unit(namespace, name).await {
            if !e.is_not_found() {
                error!("Failed to delete Unit {}/{}: {}", namespace, name, e);
            }
        }
        if let Err(e) = self.client.delete_tunnel(namespace, name).await {
            if !e.is_not_found() {
                error!("Failed to delete Tunnel {}/{}: {}", namespace, name, e);
            }
        }
    }
}

/// Derive the Unit for a workspace. Defaults follow the standard workbench
/// shape: one GPU when requested, 1 CPU / 2Gi quota, SSH entrypoint.
pub(crate) fn generate_unit(workspace: &Workspace) -> Unit {
    let namespace = workspace.namespace().unwrap_or_default();
    let name = workspace.name_any();

    let mut unit = Unit::new(
        &name,
        UnitSpec {
            gpu_policy: GpuPolicy {
                gpu: workspace.spec.gpu,
                model: None,
                number: 1,
            },
            framework: workspace.spec.framework.clone(),
            resources: ResourceQuota {
                cpu: "1".to_string(),
                memory: "2Gi".to_string(),
            },
            lifecycle: Lifecycle {
                days: workspace.spec.days,
                forever: false,
            },
            ports: vec![],
            execution: Execution {
                ssh: true,
                env: vec![],
                command: vec![],
                args: vec![],
            },
        },
    );
    unit.metadata.namespace = Some(namespace);
    unit
}

/// Derive the Tunnel for a workspace: a single SSH mapping from container
/// port 22 to the allocated node port.
pub(crate) fn generate_tunnel(workspace: &Workspace, node_port: i32) -> Tunnel {
    let namespace = workspace.namespace().unwrap_or_default();
    let name = workspace.name_any();

    let mut tunnel = Tunnel::new(
        &name,
        TunnelSpec {
            unit_id: unit_id(&namespace, &name),
            ports: vec![TunnelPort {
                name: Some("ssh".to_string()),
                protocol: Protocol::Tcp,
                container_port: 22,
                node_port,
            }],
        },
    );
    tunnel.metadata.namespace = Some(namespace);
    tunnel
}
