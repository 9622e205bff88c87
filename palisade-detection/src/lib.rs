//! # Palisade Detection
//!
//! Perimeter node decision logic: tiered confidence policy, one-hop peer
//! verification and timeout resolution, plus the confidence models that
//! score sensing events.

pub mod confidence;
pub mod node;
pub mod types;

pub use confidence::{ConfidenceModel, FixedConfidence, GaussianConfidence};
pub use node::{DetectionTier, DiscardReason, NodeAction, NodeState, PerimeterNode};
pub use types::{EventId, NodeId, PeerMessage, Position, SensorReading};
