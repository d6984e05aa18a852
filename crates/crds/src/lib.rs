//! Workbench CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Workbench operator.
//!
//! The resource chain is `Workspace` -> `Unit` -> `Tunnel`: a `Workspace` is
//! the user-facing request for a dev environment, a `Unit` describes the
//! container/GPU/lifecycle requirements of one workload instance, and a
//! `Tunnel` describes the externally reachable NodePort mapping for it.
//! Children share their parent's namespace/name; there are no owner
//! references.

pub mod labels;
pub mod tunnel;
pub mod unit;
pub mod workspace;

pub use labels::*;
pub use tunnel::*;
pub use unit::*;
pub use workspace::*;
