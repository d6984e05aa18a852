//! Main controller implementation.
//!
//! This module contains the `Controller` struct that orchestrates
//! reconciliation, resource watching, and the periodic sweeps for the
//! Workbench Controller.
//!
//! The controller manages three CRD types:
//! - Workspace: user-facing request for a dev environment
//! - Unit: workload description derived from a Workspace
//! - Tunnel: NodePort exposure for a Unit

use crate::error::ControllerError;
use crate::ports::PortMap;
use crate::reconciler::Reconciler;
use crate::sweeper::Sweeper;
use crate::watcher::Watcher;
use cluster_client::{ClusterClient, ClusterClientTrait};
use crds::{Tunnel, Unit, Workspace};
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

/// Main controller for Workbench resource management.
pub struct Controller {
    workspace_watcher: JoinHandle<Result<(), ControllerError>>,
    unit_watcher: JoinHandle<Result<(), ControllerError>>,
    tunnel_watcher: JoinHandle<Result<(), ControllerError>>,
    pod_watcher: JoinHandle<Result<(), ControllerError>>,
    workspace_sweep: JoinHandle<()>,
    unit_sweep: JoinHandle<()>,
    tunnel_sweep: JoinHandle<()>,
    port_refresh: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(
        registry: String,
        data_root: String,
        namespace: Option<String>,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Workbench Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await.map_err(ControllerError::Kube)?;

        let client: Arc<dyn ClusterClientTrait> =
            Arc::new(ClusterClient::new(kube_client.clone(), namespace.clone()));
        let ports = Arc::new(PortMap::new());

        // Seed the port map from existing tunnels before any reconcile can
        // allocate; the periodic refresh repairs a failed seed later
        let sweeper = Sweeper::new(client.clone(), ports.clone());
        if let Err(e) = sweeper.refresh_ports().await {
            warn!("Initial port map refresh failed, starting empty: {}", e);
        }

        let reconciler = Arc::new(Reconciler::new(
            client.clone(),
            ports.clone(),
            registry,
            data_root,
        ));

        // API handles for the watch streams
        let workspace_api: Api<Workspace> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };
        let unit_api: Api<Unit> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };
        let tunnel_api: Api<Tunnel> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };
        let pod_api: Api<Pod> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        // Create a single watcher instance that handles all watched types
        let watcher_instance = Arc::new(Watcher::new(
            reconciler,
            workspace_api,
            unit_api,
            tunnel_api,
            pod_api,
        ));

        // Start watchers in background tasks
        let workspace_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_workspaces().await })
        };

        let unit_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_units().await })
        };

        let tunnel_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_tunnels().await })
        };

        let pod_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_pods().await })
        };

        // Start the periodic sweeps
        let (shutdown, shutdown_rx) = watch::channel(false);
        let sweeper = Arc::new(sweeper);

        let sweep = sweeper.clone();
        let rx = shutdown_rx.clone();
        let workspace_sweep = tokio::spawn(async move { sweep.run_workspace_sweep(rx).await });

        let sweep = sweeper.clone();
        let rx = shutdown_rx.clone();
        let unit_sweep = tokio::spawn(async move { sweep.run_unit_sweep(rx).await });

        let sweep = sweeper.clone();
        let rx = shutdown_rx.clone();
        let tunnel_sweep = tokio::spawn(async move { sweep.run_tunnel_sweep(rx).await });

        let sweep = sweeper;
        let port_refresh = tokio::spawn(async move { sweep.run_port_refresh(shutdown_rx).await });

        Ok(Self {
            workspace_watcher,
            unit_watcher,
            tunnel_watcher,
            pod_watcher,
            workspace_sweep,
            unit_sweep,
            tunnel_sweep,
            port_refresh,
            shutdown,
        })
    }

    /// Runs the controller until a watcher exits or a shutdown signal
    /// arrives, then stops the sweep loops.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Workbench Controller running");

        // Wait for a watcher to exit (they should run forever) or ctrl-c
        let result = tokio::select! {
            result = &mut self.workspace_watcher => watcher_result("Workspace", result),
            result = &mut self.unit_watcher => watcher_result("Unit", result),
            result = &mut self.tunnel_watcher => watcher_result("Tunnel", result),
            result = &mut self.pod_watcher => watcher_result("Pod", result),
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        // Stop the sweep loops and wait for them to observe the flag
        let _ = self.shutdown.send(true);
        for handle in [
            self.workspace_sweep,
            self.unit_sweep,
            self.tunnel_sweep,
            self.port_refresh,
        ] {
            let _ = handle.await;
        }

        result
    }
}

fn watcher_result(
    kind: &str,
    result: Result<Result<(), ControllerError>, JoinError>,
) -> Result<(), ControllerError> {
    match result {
        Ok(inner) => {
            inner.map_err(|e| ControllerError::Watch(format!("{} watcher error: {}", kind, e)))
        }
        Err(e) => Err(ControllerError::Watch(format!(
            "{} watcher panicked: {}",
            kind, e
        ))),
    }
}
