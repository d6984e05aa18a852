//! Workspace CRD
//!
//! The user-facing request for a dev environment. The Workspace reconciler
//! derives a same-named `Unit` and `Tunnel` from it; status mirrors the
//! Unit's phase and records the allocated node port.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "workbench.microscaler.io",
    version = "v1alpha1",
    kind = "Workspace",
    namespaced,
    status = "WorkspaceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSpec {
    /// Whether the workload needs a GPU
    #[serde(default)]
    pub gpu: bool,

    /// ML framework to run
    pub framework: Framework,

    /// Days before the workspace expires (0 = never)
    #[serde(default)]
    pub days: u32,
}

/// ML framework identifier, resolved to a container image by the Unit
/// reconciler (`<framework>-{gpu|cpu}:<version>`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Framework {
    /// Framework name (e.g. "tensorflow", "pytorch")
    pub name: String,

    /// Framework version tag
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStatus {
    /// Current phase, mirrored from the derived Unit (Pod phase strings:
    /// "Pending", "Running", "Succeeded", "Failed", "Unknown")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Node port allocated for SSH access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<i32>,
}
