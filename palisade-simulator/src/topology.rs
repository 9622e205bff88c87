//! # Topology
//!
//! Node placement and the neighbour relation. Built once before a run and
//! never mutated afterwards.
//!
//! ## Layouts:
//! - `dual_ring`: an outer and an inner ring, the inner one rotated by a
//!   fixed angular offset
//! - `from_positions`: arbitrary placements, mostly for scenario tests

use serde::Serialize;

use palisade_config::{DetectionConfig, TopologyConfig};
use palisade_detection::{NodeId, PerimeterNode, Position};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePlacement {
    pub id: NodeId,
    pub position: Position,
    pub neighbours: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topology {
    peer_range: f64,
    nodes: Vec<NodePlacement>,
}

impl Topology {
    /// Outer ring first (ids `0..outer`), then the inner ring.
    pub fn dual_ring(config: &TopologyConfig) -> Self {
        let outer = ring(config.outer_ring_nodes, config.outer_ring_radius, 0.0);
        let inner = ring(
            config.inner_ring_nodes,
            config.inner_ring_radius,
            config.inner_ring_offset_deg,
        );
        Self::from_positions(outer.chain(inner), config.peer_range)
    }

    /// Ids are assigned in iteration order. Two distinct nodes are
    /// neighbours iff their distance is at most `peer_range`.
    pub fn from_positions(positions: impl IntoIterator<Item = Position>, peer_range: f64) -> Self {
        let positions: Vec<Position> = positions.into_iter().collect();
        let nodes = positions
            .iter()
            .enumerate()
            .map(|(i, position)| NodePlacement {
                id: NodeId(i as u32),
                position: *position,
                neighbours: positions
                    .iter()
                    .enumerate()
                    .filter(|(j, other)| *j != i && position.distance(other) <= peer_range)
                    .map(|(j, _)| NodeId(j as u32))
                    .collect(),
            })
            .collect();
        Self { peer_range, nodes }
    }

    pub fn peer_range(&self) -> f64 {
        self.peer_range
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn placements(&self) -> &[NodePlacement] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&NodePlacement> {
        self.nodes.get(id.index())
    }

    /// Instantiates one idle state machine per placement.
    pub fn build_nodes(&self, policy: &DetectionConfig) -> Vec<PerimeterNode> {
        self.nodes
            .iter()
            .map(|p| {
                PerimeterNode::new(p.id, p.position, p.neighbours.iter().copied(), policy.clone())
            })
            .collect()
    }
}

fn ring(count: u32, radius: f64, offset_deg: f64) -> impl Iterator<Item = Position> {
    let step = if count == 0 { 0.0 } else { 360.0 / f64::from(count) };
    (0..count).map(move |i| {
        let angle = (f64::from(i) * step + offset_deg).to_radians();
        Position::new(radius * angle.cos(), radius * angle.sin())
    })
}
