//! Tunnel CRD
//!
//! External exposure for one Unit: a list of container-port to node-port
//! mappings realized as a NodePort Service. `unit_id` carries the dotted
//! `namespace.name` identity of the Unit so the Service selector can match
//! the Pod's unit-id label.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::unit::Protocol;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "workbench.microscaler.io",
    version = "v1alpha1",
    kind = "Tunnel",
    namespaced,
    status = "TunnelStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct TunnelSpec {
    /// Dotted `namespace.name` identity of the Unit this tunnel exposes
    pub unit_id: String,

    /// Port mappings to expose
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<TunnelPort>,
}

/// One container-port to node-port mapping.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TunnelPort {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// L4 protocol
    #[serde(default)]
    pub protocol: Protocol,

    /// Port exposed by the container
    pub container_port: i32,

    /// Node port from the shared allocation range
    pub node_port: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TunnelStatus {
    /// Conditions mirrored from the derived Service
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// A status condition, shaped like the Kubernetes meta/v1 Condition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type
    #[serde(rename = "type")]
    pub type_: String,

    /// "True", "False" or "Unknown"
    pub status: String,

    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the condition last changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<chrono::DateTime<chrono::Utc>>,

    /// Generation the condition was observed at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
