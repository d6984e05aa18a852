//! Unit CRD
//!
//! Mid-level description of one workload instance: container image inputs,
//! GPU policy, resource quota, declared ports, execution parameters and
//! lifecycle. The Unit reconciler derives a same-named Pod from it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::workspace::Framework;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "workbench.microscaler.io",
    version = "v1alpha1",
    kind = "Unit",
    namespaced,
    status = "UnitStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct UnitSpec {
    /// GPU policy
    pub gpu_policy: GpuPolicy,

    /// ML framework to run
    pub framework: Framework,

    /// Resource quota for the container
    pub resources: ResourceQuota,

    /// Lifecycle policy
    #[serde(default)]
    pub lifecycle: Lifecycle,

    /// Container ports; when empty a default ssh port (22) is exposed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortSpec>,

    /// Execution parameters
    pub execution: Execution,
}

/// GPU requirements of a Unit.
///
/// `number` feeds the Pod's `nvidia.com/gpu` limit; when `gpu` is false the
/// limit is forced to zero regardless of `number`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GpuPolicy {
    /// Whether the Pod gets a GPU at all
    pub gpu: bool,

    /// Requested GPU model, matched against the gpu-model node label
    /// (default model list when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Number of GPUs
    #[serde(default)]
    pub number: u32,
}

/// CPU and memory quota, as Kubernetes quantity strings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuota {
    /// CPU limit (e.g. "1", "500m")
    pub cpu: String,

    /// Memory limit (e.g. "2Gi")
    pub memory: String,
}

/// How long a Unit may live before the sweeper expires it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    /// Days before expiry (0 = no expiry)
    #[serde(default)]
    pub days: u32,

    /// Never expire, regardless of `days`
    #[serde(default)]
    pub forever: bool,
}

/// A container port declared on the Unit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Port number exposed by the container
    pub container_port: i32,

    /// L4 protocol
    #[serde(default)]
    pub protocol: Protocol,
}

/// L4 protocol of a port, serialized in the Kubernetes upper-case form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// TCP (the default)
    #[default]
    Tcp,

    /// UDP
    Udp,
}

impl Protocol {
    /// The Kubernetes string form ("TCP"/"UDP").
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// Entrypoint and environment of the workload container.
///
/// When `ssh` is set the image's SSH entrypoint owns the container: any
/// declared command/args are discarded by the Pod derivation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Start an SSH entrypoint instead of a user command
    #[serde(default)]
    pub ssh: bool,

    /// Extra environment variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    /// Container command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    /// Command arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// A literal environment variable.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,

    /// Variable value
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UnitStatus {
    /// Current phase, mirrored from the derived Pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}
