//! Kubernetes resource watchers.
//!
//! This module handles watching the workbench resources for changes and
//! triggering reconciliation. Reconciles run on the object identity, so a
//! Delete event drives the same teardown path as any other edge.
//!
//! Pods are watched too, filtered to managed ones: a deleted Pod under a
//! live Unit triggers the Unit reconcile that recreates it.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{managed_selector, Tunnel, Unit, Workspace};
use futures::TryStreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, ResourceExt};
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Watches Kubernetes resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    workspace_api: Api<Workspace>,
    unit_api: Api<Unit>,
    tunnel_api: Api<Tunnel>,
    pod_api: Api<Pod>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        workspace_api: Api<Workspace>,
        unit_api: Api<Unit>,
        tunnel_api: Api<Tunnel>,
        pod_api: Api<Pod>,
    ) -> Self {
        Self {
            reconciler,
            workspace_api,
            unit_api,
            tunnel_api,
            pod_api,
        }
    }

    /// Starts watching Workspace resources.
    pub async fn watch_workspaces(&self) -> Result<(), ControllerError> {
        info!("Starting Workspace watcher");

        let mut stream = Box::pin(watcher(
            self.workspace_api.clone(),
            watcher::Config::default(),
        ));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(workspace) => {
                    let namespace = workspace.namespace().unwrap_or_default();
                    let name = workspace.name_any();
                    info!("Workspace applied: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_workspace(&namespace, &name).await {
                        error!("Failed to reconcile Workspace {}/{}: {}", namespace, name, e);
                    }
                }
                watcher::Event::Delete(workspace) => {
                    let namespace = workspace.namespace().unwrap_or_default();
                    let name = workspace.name_any();
                    info!("Workspace deleted: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_workspace(&namespace, &name).await {
                        error!(
                            "Failed to reconcile deleted Workspace {}/{}: {}",
                            namespace, name, e
                        );
                    }
                }
                watcher::Event::Init => {
                    info!("Workspace watcher initialized");
                }
                watcher::Event::InitApply(workspace) => {
                    let namespace = workspace.namespace().unwrap_or_default();
                    let name = workspace.name_any();
                    debug!("Workspace init apply: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_workspace(&namespace, &name).await {
                        warn!("Failed to reconcile Workspace {}/{}: {}", namespace, name, e);
                    }
                }
                watcher::Event::InitDone => {
                    info!("Workspace watcher initialization complete");
                }
            }
        }

        Ok(())
    }

    /// Starts watching Unit resources.
    pub async fn watch_units(&self) -> Result<(), ControllerError> {
        info!("Starting Unit watcher");

        let mut stream = Box::pin(watcher(self.unit_api.clone(), watcher::Config::default()));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(unit) => {
                    let namespace = unit.namespace().unwrap_or_default();
                    let name = unit.name_any();
                    info!("Unit applied: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_unit(&namespace, &name).await {
                        error!("Failed to reconcile Unit {}/{}: {}", namespace, name, e);
                    }
                }
                watcher::Event::Delete(unit) => {
                    let namespace = unit.namespace().unwrap_or_default();
                    let name = unit.name_any();
                    info!("Unit deleted: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_unit(&namespace, &name).await {
                        error!(
                            "Failed to reconcile deleted Unit {}/{}: {}",
                            namespace, name, e
                        );
                    }
                }
                watcher::Event::Init => {
                    info!("Unit watcher initialized");
                }
                watcher::Event::InitApply(unit) => {
                    let namespace = unit.namespace().unwrap_or_default();
                    let name = unit.name_any();
                    debug!("Unit init apply: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_unit(&namespace, &name).await {
                        warn!("Failed to reconcile Unit {}/{}: {}", namespace, name, e);
                    }
                }
                watcher::Event::InitDone => {
                    info!("Unit watcher initialization complete");
                }
            }
        }

        Ok(())
    }

    /// Starts watching Tunnel resources.
    pub async fn watch_tunnels(&self) -> Result<(), ControllerError> {
        info!("Starting Tunnel watcher");

        let mut stream = Box::pin(watcher(self.tunnel_api.clone(), watcher::Config::default()));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(tunnel) => {
                    let namespace = tunnel.namespace().unwrap_or_default();
                    let name = tunnel.name_any();
                    info!("Tunnel applied: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_tunnel(&namespace, &name).await {
                        error!("Failed to reconcile Tunnel {}/{}: {}", namespace, name, e);
                    }
                }
                watcher::Event::Delete(tunnel) => {
                    let namespace = tunnel.namespace().unwrap_or_default();
                    let name = tunnel.name_any();
                    info!("Tunnel deleted: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_tunnel(&namespace, &name).await {
                        error!(
                            "Failed to reconcile deleted Tunnel {}/{}: {}",
                            namespace, name, e
                        );
                    }
                }
                watcher::Event::Init => {
                    info!("Tunnel watcher initialized");
                }
                watcher::Event::InitApply(tunnel) => {
                    let namespace = tunnel.namespace().unwrap_or_default();
                    let name = tunnel.name_any();
                    debug!("Tunnel init apply: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_tunnel(&namespace, &name).await {
                        warn!("Failed to reconcile Tunnel {}/{}: {}", namespace, name, e);
                    }
                }
                watcher::Event::InitDone => {
                    info!("Tunnel watcher initialization complete");
                }
            }
        }

        Ok(())
    }

    /// Starts watching managed Pods. Only deletions matter here: the Unit
    /// reconcile recreates the Pod while its Unit still exists.
    pub async fn watch_pods(&self) -> Result<(), ControllerError> {
        info!("Starting Pod watcher");

        let config = watcher::Config::default().labels(&managed_selector());
        let mut stream = Box::pin(watcher(self.pod_api.clone(), config));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(pod) => {
                    let namespace = pod.namespace().unwrap_or_default();
                    let name = pod.name_any();
                    debug!("Pod applied: {}/{}", namespace, name);
                }
                watcher::Event::Delete(pod) => {
                    let namespace = pod.namespace().unwrap_or_default();
                    let name = pod.name_any();
                    info!("Managed Pod deleted: {}/{}", namespace, name);

                    if let Err(e) = self.reconciler.reconcile_unit(&namespace, &name).await {
                        error!(
                            "Failed to reconcile Unit {}/{} after Pod deletion: {}",
                            namespace, name, e
                        );
                    }
                }
                watcher::Event::Init => {
                    info!("Pod watcher initialized");
                }
                watcher::Event::InitApply(pod) => {
                    let namespace = pod.namespace().unwrap_or_default();
                    let name = pod.name_any();
                    debug!("Pod init apply: {}/{}", namespace, name);
                }
                watcher::Event::InitDone => {
                    info!("Pod watcher initialization complete");
                }
            }
        }

        Ok(())
    }
}
