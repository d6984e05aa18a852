//! Tunnel reconciler
//!
//! Converges one Tunnel into its derived NodePort Service. The Service
//! selects the Pod through the unit-id label recorded in the tunnel spec.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use tracing::{error, info};

use crds::{Tunnel, MANAGED_LABEL, MANAGED_LABEL_VALUE, UNIT_ID_LABEL};

use super::Reconciler;
use crate::error::ControllerError;

impl Reconciler {
    /// Reconcile one tunnel by identity: tear down the Service of an absent
    /// or terminating tunnel, create the Service of a live one if missing.
    pub async fn reconcile_tunnel(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ControllerError> {
        info!("Reconciling Tunnel {}/{}", namespace, name);

        let tunnel = match self.client.get_tunnel(namespace, name).await {
            Ok(tunnel) => tunnel,
            Err(e) if e.is_not_found() => {
                info!(
                    "Tunnel {}/{} is gone, removing derived Service",
                    namespace, name
                );
                self.delete_tunnel_service(namespace, name).await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if tunnel.metadata.deletion_timestamp.is_some() {
            info!(
                "Tunnel {}/{} is terminating, removing derived Service",
                namespace, name
            );
            self.delete_tunnel_service(namespace, name).await;
            return Ok(());
        }

        match self.client.get_service(namespace, name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                let service = generate_service(&tunnel);
                info!("Creating Service {}/{}", namespace, name);
                match self.client.create_service(&service).await {
                    Ok(_) => {}
                    Err(e) if e.is_already_exists() => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn delete_tunnel_service(&self, namespace: &str, name: &str) {
        if let Err(e) = self.client.delete_service(namespace, name).await {
            if !e.is_not_found() {
                error!("Failed to delete Service {}/{}: {}", namespace, name, e);
            }
        }
    }
}

/// Derive the NodePort Service for a tunnel. Port mappings are carried over
/// verbatim; the selector matches the unit-id label the Pod derivation puts
/// on its Pods.
pub(crate) fn generate_service(tunnel: &Tunnel) -> Service {
    let namespace = tunnel.namespace().unwrap_or_default();
    let name = tunnel.name_any();

    let ports: Vec<ServicePort> = tunnel
        .spec
        .ports
        .iter()
        .map(|p| ServicePort {
            name: p.name.clone(),
            protocol: Some(p.protocol.as_str().to_string()),
            port: p.container_port,
            target_port: Some(IntOrString::Int(p.container_port)),
            node_port: Some(p.node_port),
            ..Default::default()
        })
        .collect();

    let mut selector = BTreeMap::new();
    selector.insert(UNIT_ID_LABEL.to_string(), tunnel.spec.unit_id.clone());

    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_LABEL.to_string(), MANAGED_LABEL_VALUE.to_string());

    Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("NodePort".to_string()),
            selector: Some(selector),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}
