//! Reconcilers for the Workbench resource chain
//!
//! Handles: Workspace, Unit, Tunnel
//!
//! Every reconcile function takes an identity (`namespace`, `name`) rather
//! than a cached object, re-reads fresh state, and converges the derived
//! objects. Children share their parent's namespace/name, so the identity
//! of a parent is the identity of its whole chain.

pub mod tunnel;
pub mod unit;
#[cfg(test)]
mod unit_test;
pub mod workspace;
#[cfg(test)]
mod workspace_test;

use std::sync::Arc;

use cluster_client::ClusterClientTrait;

use crate::ports::PortMap;

/// Shared state for all reconcile functions.
pub struct Reconciler {
    pub(crate) client: Arc<dyn ClusterClientTrait>,
    pub(crate) ports: Arc<PortMap>,
    pub(crate) registry: String,
    pub(crate) data_root: String,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        client: Arc<dyn ClusterClientTrait>,
        ports: Arc<PortMap>,
        registry: String,
        data_root: String,
    ) -> Self {
        Self {
            client,
            ports,
            registry,
            data_root,
        }
    }
}
