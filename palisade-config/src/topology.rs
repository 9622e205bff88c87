//! Dual-ring node placement.
//!
//! Placement is owned by the topology collaborator; the core only ever sees
//! node ids and neighbour sets derived from these numbers.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct TopologyConfig {
    #[validate(range(max = 1024))]
    pub outer_ring_nodes: u32,

    #[validate(range(exclusive_min = 0.0, max = 100_000.0))]
    pub outer_ring_radius: f64,

    #[validate(range(max = 1024))]
    pub inner_ring_nodes: u32,

    #[validate(range(exclusive_min = 0.0, max = 100_000.0))]
    pub inner_ring_radius: f64,

    /// Angular offset of the inner ring relative to the outer ring (degrees).
    #[validate(range(min = 0.0, max = 360.0))]
    pub inner_ring_offset_deg: f64,

    /// Nodes within this distance exchange verification messages (metres).
    #[validate(range(min = 0.0, max = 100_000.0))]
    pub peer_range: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            outer_ring_nodes: 8,
            outer_ring_radius: 23.0,
            inner_ring_nodes: 8,
            inner_ring_radius: 14.0,
            inner_ring_offset_deg: 22.5,
            peer_range: 30.0,
        }
    }
}

impl TopologyConfig {
    pub fn node_count(&self) -> u32 {
        self.outer_ring_nodes + self.inner_ring_nodes
    }
}
