//! Labels shared across Workbench-managed objects
//!
//! Every Pod and Service derived by the operator carries the managed label;
//! Pods additionally carry the unit-id label that Services select on. Both
//! sides use the dotted `namespace.name` form (a `/` is not a legal label
//! value).

/// Marks an object as created and owned by the Workbench operator.
pub const MANAGED_LABEL: &str = "workbench.microscaler.io/managed";

/// Value of [`MANAGED_LABEL`] on managed objects.
pub const MANAGED_LABEL_VALUE: &str = "true";

/// Carries the owning Unit's dotted identity on derived Pods; Service
/// selectors match it against the Tunnel's recorded unit id.
pub const UNIT_ID_LABEL: &str = "workbench.microscaler.io/unit-id";

/// Node label holding the GPU model installed on a node, matched by the
/// node affinity of GPU-enabled Pods.
pub const GPU_MODEL_LABEL: &str = "workbench.microscaler.io/gpu-model";

/// Dotted identity of a Unit, used as the unit-id label value and as the
/// Tunnel -> Unit reference.
pub fn unit_id(namespace: &str, name: &str) -> String {
    format!("{namespace}.{name}")
}

/// Label selector string matching all Workbench-managed objects.
pub fn managed_selector() -> String {
    format!("{MANAGED_LABEL}={MANAGED_LABEL_VALUE}")
}
