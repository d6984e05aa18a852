//! Test utilities for unit testing reconcilers and sweeps
//!
//! This module provides helpers for creating test data and wiring the
//! reconciler/sweeper to the mock cluster client.

use std::sync::Arc;

use chrono::{Duration, Utc};
use k8s_openapi::api::core::v1::{Pod, PodStatus, Service, ServiceStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    Condition as K8sCondition, ObjectMeta, Time,
};

use cluster_client::MockClusterClient;
use crds::{
    unit_id, Execution, Framework, GpuPolicy, Lifecycle, Protocol, ResourceQuota, Tunnel,
    TunnelPort, TunnelSpec, Unit, UnitSpec, Workspace, WorkspaceSpec,
};

use crate::ports::PortMap;
use crate::reconciler::Reconciler;
use crate::sweeper::Sweeper;

/// Registry used by test reconcilers.
pub const TEST_REGISTRY: &str = "registry.test";

/// Data root used by test reconcilers.
pub const TEST_DATA_ROOT: &str = "/data";

/// Reconciler wired to the given mock client and port map.
pub fn create_test_reconciler(client: &MockClusterClient, ports: Arc<PortMap>) -> Reconciler {
    Reconciler::new(
        Arc::new(client.clone()),
        ports,
        TEST_REGISTRY.to_string(),
        TEST_DATA_ROOT.to_string(),
    )
}

/// Sweeper wired to the given mock client and port map.
pub fn create_test_sweeper(client: &MockClusterClient, ports: Arc<PortMap>) -> Sweeper {
    Sweeper::new(Arc::new(client.clone()), ports)
}

/// Shift an object's creation timestamp `days` into the past.
pub fn created_days_ago(meta: &mut ObjectMeta, days: i64) {
    meta.creation_timestamp = Some(Time(Utc::now() - Duration::days(days)));
}

/// Helper to create a test Workspace CRD
pub fn create_test_workspace(name: &str, namespace: &str, gpu: bool, days: u32) -> Workspace {
    Workspace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            creation_timestamp: Some(Time(Utc::now())),
            ..Default::default()
        },
        spec: WorkspaceSpec {
            gpu,
            framework: Framework {
                name: "tensorflow".to_string(),
                version: "2.4".to_string(),
            },
            days,
        },
        status: None,
    }
}

/// Helper to create a test Unit CRD
pub fn create_test_unit(name: &str, namespace: &str, days: u32, forever: bool) -> Unit {
    Unit {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            creation_timestamp: Some(Time(Utc::now())),
            ..Default::default()
        },
        spec: UnitSpec {
            gpu_policy: GpuPolicy {
                gpu: false,
                model: None,
                number: 1,
            },
            framework: Framework {
                name: "tensorflow".to_string(),
                version: "2.4".to_string(),
            },
            resources: ResourceQuota {
                cpu: "1".to_string(),
                memory: "2Gi".to_string(),
            },
            lifecycle: Lifecycle { days, forever },
            ports: vec![],
            execution: Execution {
                ssh: true,
                env: vec![],
                command: vec![],
                args: vec![],
            },
        },
        status: None,
    }
}

/// Helper to create a test Tunnel CRD with a single SSH mapping
pub fn create_test_tunnel(name: &str, namespace: &str, node_port: i32) -> Tunnel {
    Tunnel {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: TunnelSpec {
            unit_id: unit_id(namespace, name),
            ports: vec![TunnelPort {
                name: Some("ssh".to_string()),
                protocol: Protocol::Tcp,
                container_port: 22,
                node_port,
            }],
        },
        status: None,
    }
}

/// Helper to create a test Pod with a phase
pub fn create_test_pod(name: &str, namespace: &str, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Helper to create a test Service carrying the given conditions
pub fn create_test_service(name: &str, namespace: &str, conditions: Vec<K8sCondition>) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        status: Some(ServiceStatus {
            conditions: Some(conditions),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Helper to create a meta/v1 condition
pub fn create_test_condition(type_: &str, status: &str) -> K8sCondition {
    K8sCondition {
        type_: type_.to_string(),
        status: status.to_string(),
        reason: "Test".to_string(),
        message: String::new(),
        last_transition_time: Time(Utc::now()),
        observed_generation: None,
    }
}
