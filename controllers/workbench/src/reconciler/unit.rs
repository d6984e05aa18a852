//! Unit reconciler
//!
//! Converges one Unit into its derived Pod. The Pod derivation carries all
//! the workload policy: image selection, GPU scheduling, resource limits,
//! SSH entrypoint handling and the per-namespace data volume.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, Container, ContainerPort, EnvVar, HostPathVolumeSource, NodeAffinity, NodeSelector,
    NodeSelectorRequirement, NodeSelectorTerm, Pod, PodSpec, ResourceRequirements, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tracing::{error, info};

use crds::{unit_id, Unit, GPU_MODEL_LABEL, MANAGED_LABEL, MANAGED_LABEL_VALUE, UNIT_ID_LABEL};

use super::Reconciler;
use crate::error::ControllerError;

/// GPU model assumed when a GPU unit does not name one.
pub(crate) const DEFAULT_GPU_MODEL: &str = "GTX-1660";

impl Reconciler {
    /// Reconcile one unit by identity: tear down the Pod of an absent or
    /// terminating unit, create the Pod of a live one if missing.
    pub async fn reconcile_unit(&self, namespace: &str, name: &str) -> Result<(), ControllerError> {
        info!("Reconciling Unit {}/{}", namespace, name);

        let unit = match self.client.get_unit(namespace, name).await {
            Ok(unit) => unit,
            Err(e) if e.is_not_found() => {
                info!("Unit {}/{} is gone, removing derived Pod", namespace, name);
                self.delete_unit_pod(namespace, name).await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if unit.metadata.deletion_timestamp.is_some() {
            info!(
                "Unit {}/{} is terminating, removing derived Pod",
                namespace, name
            );
            self.delete_unit_pod(namespace, name).await;
            return Ok(());
        }

        match self.client.get_pod(namespace, name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                let pod = self.generate_pod(&unit);
                info!("Creating Pod {}/{}", namespace, name);
                match self.client.create_pod(&pod).await {
                    Ok(_) => {}
                    Err(e) if e.is_already_exists() => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn delete_unit_pod(&self, namespace: &str, name: &str) {
        if let Err(e) = self.client.delete_pod(namespace, name).await {
            if !e.is_not_found() {
                error!("Failed to delete Pod {}/{}: {}", namespace, name, e);
            }
        }
    }

    /// Derive the Pod for a unit.
    ///
    /// The image is `<registry>/<framework>-{gpu|cpu}:<version>`. GPU units
    /// get a required node affinity on the gpu-model label; CPU units carry
    /// no affinity and their `nvidia.com/gpu` limit is forced to zero. When
    /// the unit wants SSH, the image entrypoint owns the container and any
    /// declared command/args are dropped.
    pub(crate) fn generate_pod(&self, unit: &Unit) -> Pod {
        let namespace = unit.namespace().unwrap_or_default();
        let name = unit.name_any();
        let spec = &unit.spec;

        let flavor = if spec.gpu_policy.gpu { "gpu" } else { "cpu" };
        let image = format!(
            "{}/{}-{}:{}",
            self.registry, spec.framework.name, flavor, spec.framework.version
        );

        let mut env: Vec<EnvVar> = spec
            .execution
            .env
            .iter()
            .map(|e| EnvVar {
                name: e.name.clone(),
                value: Some(e.value.clone()),
                ..Default::default()
            })
            .collect();
        // The workload images buffer Python output without this
        env.push(EnvVar {
            name: "PYTHONUNBUFFERED".to_string(),
            value: Some("0".to_string()),
            ..Default::default()
        });

        // A unit with no declared ports still gets its SSH port
        let ports: Vec<ContainerPort> = if spec.ports.is_empty() {
            vec![ContainerPort {
                name: Some("ssh".to_string()),
                container_port: 22,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]
        } else {
            spec.ports
                .iter()
                .map(|p| ContainerPort {
                    name: p.name.clone(),
                    container_port: p.container_port,
                    protocol: Some(p.protocol.as_str().to_string()),
                    ..Default::default()
                })
                .collect()
        };

        let (command, args) = if spec.execution.ssh {
            (None, None)
        } else {
            (
                (!spec.execution.command.is_empty()).then(|| spec.execution.command.clone()),
                (!spec.execution.args.is_empty()).then(|| spec.execution.args.clone()),
            )
        };

        let mut limits = BTreeMap::new();
        limits.insert("cpu".to_string(), Quantity(spec.resources.cpu.clone()));
        limits.insert("memory".to_string(), Quantity(spec.resources.memory.clone()));
        let gpus = if spec.gpu_policy.gpu {
            spec.gpu_policy.number
        } else {
            0
        };
        limits.insert("nvidia.com/gpu".to_string(), Quantity(gpus.to_string()));

        let affinity = if spec.gpu_policy.gpu {
            let models = vec![spec
                .gpu_policy
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_GPU_MODEL.to_string())];
            Some(Affinity {
                node_affinity: Some(NodeAffinity {
                    required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                        node_selector_terms: vec![NodeSelectorTerm {
                            match_expressions: Some(vec![NodeSelectorRequirement {
                                key: GPU_MODEL_LABEL.to_string(),
                                operator: "In".to_string(),
                                values: Some(models),
                            }]),
                            ..Default::default()
                        }],
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            })
        } else {
            None
        };

        let mut labels = BTreeMap::new();
        labels.insert(MANAGED_LABEL.to_string(), MANAGED_LABEL_VALUE.to_string());
        labels.insert(UNIT_ID_LABEL.to_string(), unit_id(&namespace, &name));

        let volume_name = format!("{}-vol", name);

        Pod {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: name.clone(),
                    image: Some(image),
                    command,
                    args,
                    env: Some(env),
                    ports: Some(ports),
                    resources: Some(ResourceRequirements {
                        limits: Some(limits),
                        ..Default::default()
                    }),
                    volume_mounts: Some(vec![VolumeMount {
                        name: volume_name.clone(),
                        mount_path: "/data".to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                restart_policy: Some("Never".to_string()),
                affinity,
                volumes: Some(vec![Volume {
                    name: volume_name,
                    host_path: Some(HostPathVolumeSource {
                        path: format!("{}/{}", self.data_root, namespace),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
