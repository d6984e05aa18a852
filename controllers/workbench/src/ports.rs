//! Shared node-port allocation map.
//!
//! Tracks which ports of the NodePort range are taken by Tunnels. The map
//! is advisory: the set of Tunnel objects in the cluster is the source of
//! truth, and the refresher rebuilds the map from them periodically, which
//! also returns ports of deleted Tunnels to the pool.

use std::sync::{PoisonError, RwLock};

/// First port of the allocation range.
pub const NODE_PORT_MIN: i32 = 30000;

/// One past the last port of the allocation range.
pub const NODE_PORT_MAX: i32 = 32000;

/// In-memory availability map over `[NODE_PORT_MIN, NODE_PORT_MAX)`.
///
/// Allocation is a two-step find + mark: `allocate` returns a candidate
/// without claiming it, and the caller marks it used once the Tunnel create
/// has succeeded. Concurrent reconciles may get the same candidate; the
/// API server rejects the second Tunnel create and arbitrates the race.
pub struct PortMap {
    used: RwLock<Vec<bool>>,
}

impl PortMap {
    /// Create a map with every port available.
    pub fn new() -> Self {
        Self {
            used: RwLock::new(vec![false; (NODE_PORT_MAX - NODE_PORT_MIN) as usize]),
        }
    }

    /// True when `port` falls inside the allocation range.
    pub fn in_range(port: i32) -> bool {
        (NODE_PORT_MIN..NODE_PORT_MAX).contains(&port)
    }

    /// Find the lowest port not currently marked used, without claiming it.
    /// Returns `None` when the whole range is taken.
    pub fn allocate(&self) -> Option<i32> {
        let used = self.used.read().unwrap_or_else(PoisonError::into_inner);
        used.iter()
            .position(|taken| !taken)
            .map(|idx| NODE_PORT_MIN + idx as i32)
    }

    /// Mark `port` as taken. Ports outside the range are ignored.
    pub fn mark_used(&self, port: i32) {
        if !Self::in_range(port) {
            return;
        }
        let mut used = self.used.write().unwrap_or_else(PoisonError::into_inner);
        used[(port - NODE_PORT_MIN) as usize] = true;
    }

    /// True when `port` is currently marked used.
    pub fn is_used(&self, port: i32) -> bool {
        if !Self::in_range(port) {
            return false;
        }
        let used = self.used.read().unwrap_or_else(PoisonError::into_inner);
        used[(port - NODE_PORT_MIN) as usize]
    }

    /// Replace the whole map with exactly the given ports, under a single
    /// write lock. Ports no longer in `ports` become available again;
    /// out-of-range ports are ignored.
    pub fn rebuild(&self, ports: &[i32]) {
        let mut used = self.used.write().unwrap_or_else(PoisonError::into_inner);
        used.fill(false);
        for &port in ports {
            if Self::in_range(port) {
                used[(port - NODE_PORT_MIN) as usize] = true;
            }
        }
    }
}

impl Default for PortMap {
    fn default() -> Self {
        Self::new()
    }
}
