//! ## palisade-detection::types
//! **Identifiers and payloads exchanged between nodes and the runner**

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Stable node identity. Doubles as the node's index in the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Sequential id of a sensing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// Fixed 2D position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance.
    #[inline]
    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// What a node perceives of a sensing event.
///
/// `is_intruder` is ground truth. Nodes never branch on it; it only keys the
/// confidence model and classifies uplinks as true or false positives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub event_id: EventId,
    pub is_intruder: bool,
    /// Logical creation time of the originating event.
    pub event_time: Duration,
}

/// One-hop verification traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeerMessage {
    /// "Do you see it too?" Carries the requester's reading so the
    /// responder can score the same event.
    VerifyRequest { reading: SensorReading },
    /// Sent only when the responder's own score reaches the confirm tier.
    VerifyResponse { event_id: EventId },
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::VerifyRequest { .. } => "verify_request",
            PeerMessage::VerifyResponse { .. } => "verify_response",
        }
    }

    pub fn event_id(&self) -> EventId {
        match self {
            PeerMessage::VerifyRequest { reading } => reading.event_id,
            PeerMessage::VerifyResponse { event_id } => *event_id,
        }
    }
}
