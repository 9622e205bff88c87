//! ## palisade-detection::node
//! **Per-node tiered decision and peer verification**
//!
//! A node is a pure state machine. Every input is a method call returning the
//! [`NodeAction`]s the runner must carry out; the node itself never touches
//! the scheduler, the transport or the statistics.
//!
//! ### Tiers (on a local sensing event)
//! - `confidence >= confirm_threshold`: uplink immediately
//! - `verify_threshold <= confidence < confirm_threshold`: broadcast one
//!   verify-request to the neighbour set, arm the verification timeout
//! - below: drop silently
//!
//! At most one verification cycle (and therefore one timer) is in flight
//! per node.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use tracing::debug;

use palisade_config::{DetectionConfig, ResolutionPolicy};
use palisade_core::TimerToken;

use crate::types::{EventId, NodeId, PeerMessage, Position, SensorReading};

/// Outcome of comparing a confidence score against the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionTier {
    Confirm,
    Verify,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeState {
    Idle,
    AwaitingVerification {
        confirmations: u32,
        reading: SensorReading,
        /// `None` until the runner hands back the scheduled timer.
        timeout: Option<TimerToken>,
    },
}

/// Benign inputs a node ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiscardReason {
    /// Tier-2 reading while a verification cycle is already running.
    VerificationInFlight,
    /// Verify-response while idle.
    NoVerificationPending,
    /// Verify-response for an event other than the pending one.
    StaleResponse,
    /// Timeout fired while idle.
    UnexpectedTimeout,
    /// Message from a node outside the neighbour set.
    NotANeighbour,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::VerificationInFlight => "verification_in_flight",
            DiscardReason::NoVerificationPending => "no_verification_pending",
            DiscardReason::StaleResponse => "stale_response",
            DiscardReason::UnexpectedTimeout => "unexpected_timeout",
            DiscardReason::NotANeighbour => "not_a_neighbour",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work a node hands back to the runner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeAction {
    /// Report to the gateway.
    Uplink {
        reading: SensorReading,
        used_peer_verification: bool,
    },
    /// Deliver `message` to `to` after a transport delay.
    Send { to: NodeId, message: PeerMessage },
    /// One transmission heard by every neighbour, each after its own
    /// transport delay.
    Broadcast { message: PeerMessage },
    /// Schedule this node's verification timeout, then call
    /// [`PerimeterNode::arm_timeout`] with the token.
    StartTimeout { delay: Duration },
    CancelTimeout { token: TimerToken },
    Discard(DiscardReason),
}

#[derive(Debug, Clone)]
pub struct PerimeterNode {
    id: NodeId,
    position: Position,
    neighbours: BTreeSet<NodeId>,
    policy: DetectionConfig,
    state: NodeState,
}

impl PerimeterNode {
    /// A node never lists itself as a neighbour.
    pub fn new(
        id: NodeId,
        position: Position,
        neighbours: impl IntoIterator<Item = NodeId>,
        policy: DetectionConfig,
    ) -> Self {
        let neighbours = neighbours.into_iter().filter(|n| *n != id).collect();
        Self {
            id,
            position,
            neighbours,
            policy,
            state: NodeState::Idle,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn neighbours(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbours.iter().copied()
    }

    pub fn neighbour_count(&self) -> usize {
        self.neighbours.len()
    }

    #[inline]
    pub fn is_neighbour(&self, other: NodeId) -> bool {
        self.neighbours.contains(&other)
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, NodeState::AwaitingVerification { .. })
    }

    /// Confirmations collected by the running verification cycle.
    pub fn confirmations(&self) -> Option<u32> {
        match self.state {
            NodeState::AwaitingVerification { confirmations, .. } => Some(confirmations),
            NodeState::Idle => None,
        }
    }

    pub fn classify(&self, confidence: f64) -> DetectionTier {
        if confidence >= self.policy.confirm_threshold {
            DetectionTier::Confirm
        } else if confidence >= self.policy.verify_threshold {
            DetectionTier::Verify
        } else {
            DetectionTier::Ignore
        }
    }

    /// Local sensing event, already scored.
    pub fn on_sensor_event(
        &mut self,
        reading: SensorReading,
        confidence: f64,
        now: Duration,
    ) -> Vec<NodeAction> {
        let tier = self.classify(confidence);
        debug!(
            node = self.id.0,
            event = reading.event_id.0,
            confidence,
            ?tier,
            now = now.as_secs_f64(),
            "Sensor event scored"
        );

        match tier {
            DetectionTier::Confirm => vec![NodeAction::Uplink {
                reading,
                used_peer_verification: false,
            }],
            DetectionTier::Verify if self.is_awaiting() => {
                vec![NodeAction::Discard(DiscardReason::VerificationInFlight)]
            }
            DetectionTier::Verify => self.begin_verification(reading),
            DetectionTier::Ignore => Vec::new(),
        }
    }

    fn begin_verification(&mut self, reading: SensorReading) -> Vec<NodeAction> {
        self.state = NodeState::AwaitingVerification {
            confirmations: 0,
            reading,
            timeout: None,
        };
        vec![
            NodeAction::Broadcast {
                message: PeerMessage::VerifyRequest { reading },
            },
            NodeAction::StartTimeout {
                delay: self.policy.verification_timeout(),
            },
        ]
    }

    /// Stores the token of the timeout scheduled for a `StartTimeout`.
    /// Returns `false` if no cycle is waiting for one.
    pub fn arm_timeout(&mut self, token: TimerToken) -> bool {
        match &mut self.state {
            NodeState::AwaitingVerification { timeout, .. } if timeout.is_none() => {
                *timeout = Some(token);
                true
            }
            _ => false,
        }
    }

    /// A neighbour asks for confirmation. `confidence` is this node's own
    /// fresh score for the carried reading. Own state is never touched.
    pub fn on_verify_request(
        &self,
        from: NodeId,
        reading: SensorReading,
        confidence: f64,
    ) -> Vec<NodeAction> {
        if !self.is_neighbour(from) {
            return vec![NodeAction::Discard(DiscardReason::NotANeighbour)];
        }
        if self.classify(confidence) != DetectionTier::Confirm {
            debug!(node = self.id.0, from = from.0, confidence, "Declined to confirm");
            return Vec::new();
        }
        vec![NodeAction::Send {
            to: from,
            message: PeerMessage::VerifyResponse {
                event_id: reading.event_id,
            },
        }]
    }

    pub fn on_verify_response(
        &mut self,
        from: NodeId,
        event_id: EventId,
        now: Duration,
    ) -> Vec<NodeAction> {
        if !self.is_neighbour(from) {
            return vec![NodeAction::Discard(DiscardReason::NotANeighbour)];
        }
        let policy = self.policy.resolution_policy;
        let NodeState::AwaitingVerification {
            confirmations,
            reading,
            timeout,
        } = &mut self.state
        else {
            return vec![NodeAction::Discard(DiscardReason::NoVerificationPending)];
        };
        if reading.event_id != event_id {
            return vec![NodeAction::Discard(DiscardReason::StaleResponse)];
        }

        *confirmations += 1;
        debug!(
            node = self.id.0,
            from = from.0,
            confirmations = *confirmations,
            now = now.as_secs_f64(),
            "Verification confirmed"
        );

        match policy {
            ResolutionPolicy::AwaitTimeout => Vec::new(),
            ResolutionPolicy::FirstConfirmation => {
                let reading = *reading;
                let timeout = timeout.take();
                self.state = NodeState::Idle;
                let mut actions = vec![NodeAction::Uplink {
                    reading,
                    used_peer_verification: true,
                }];
                if let Some(token) = timeout {
                    actions.push(NodeAction::CancelTimeout { token });
                }
                actions
            }
        }
    }

    /// Verification window closed. Uplinks iff any neighbour confirmed.
    pub fn on_timeout(&mut self, now: Duration) -> Vec<NodeAction> {
        match std::mem::replace(&mut self.state, NodeState::Idle) {
            NodeState::Idle => vec![NodeAction::Discard(DiscardReason::UnexpectedTimeout)],
            NodeState::AwaitingVerification {
                confirmations,
                reading,
                ..
            } => {
                debug!(
                    node = self.id.0,
                    event = reading.event_id.0,
                    confirmations,
                    now = now.as_secs_f64(),
                    "Verification window closed"
                );
                if confirmations > 0 {
                    vec![NodeAction::Uplink {
                        reading,
                        used_peer_verification: true,
                    }]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_core::Scheduler;

    fn reading(id: u64) -> SensorReading {
        SensorReading {
            event_id: EventId(id),
            is_intruder: true,
            event_time: Duration::from_secs(1),
        }
    }

    fn node_with(policy: DetectionConfig) -> PerimeterNode {
        PerimeterNode::new(
            NodeId(0),
            Position::new(0.0, 0.0),
            [NodeId(1), NodeId(2), NodeId(0)],
            policy,
        )
    }

    fn node() -> PerimeterNode {
        node_with(DetectionConfig::default())
    }

    /// Runs a sensor event and arms the resulting timeout like the runner does.
    fn start_cycle(node: &mut PerimeterNode, timers: &mut Scheduler<NodeId>) -> Vec<NodeAction> {
        let actions = node.on_sensor_event(reading(1), 0.75, Duration::from_secs(1));
        for action in &actions {
            if let NodeAction::StartTimeout { delay } = action {
                let token = timers.schedule(*delay, node.id());
                assert!(node.arm_timeout(token));
            }
        }
        actions
    }

    #[test]
    fn excludes_self_from_neighbours() {
        let node = node();
        assert_eq!(node.neighbours().collect::<Vec<_>>(), vec![NodeId(1), NodeId(2)]);
        assert!(!node.is_neighbour(NodeId(0)));
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        let node = node();
        assert_eq!(node.classify(0.80), DetectionTier::Confirm);
        assert_eq!(node.classify(0.7999), DetectionTier::Verify);
        assert_eq!(node.classify(0.70), DetectionTier::Verify);
        assert_eq!(node.classify(0.6999), DetectionTier::Ignore);
    }

    #[test]
    fn confirm_tier_uplinks_without_verification() {
        let mut node = node();
        let actions = node.on_sensor_event(reading(1), 0.9, Duration::from_secs(1));
        assert_eq!(
            actions,
            vec![NodeAction::Uplink {
                reading: reading(1),
                used_peer_verification: false
            }]
        );
        assert_eq!(node.state(), &NodeState::Idle);
    }

    #[test]
    fn verify_tier_broadcasts_once_and_arms_timeout() {
        let mut node = node();
        let actions = node.on_sensor_event(reading(1), 0.75, Duration::from_secs(1));
        assert_eq!(
            actions,
            vec![
                NodeAction::Broadcast {
                    message: PeerMessage::VerifyRequest { reading: reading(1) }
                },
                NodeAction::StartTimeout {
                    delay: Duration::from_secs(3)
                },
            ]
        );
        assert_eq!(node.confirmations(), Some(0));
    }

    #[test]
    fn isolated_node_still_broadcasts() {
        let mut node = PerimeterNode::new(
            NodeId(4),
            Position::new(0.0, 0.0),
            std::iter::empty(),
            DetectionConfig::default(),
        );
        let actions = node.on_sensor_event(reading(1), 0.75, Duration::from_secs(1));
        assert!(matches!(actions[0], NodeAction::Broadcast { .. }));
        assert!(node.is_awaiting());
    }

    #[test]
    fn ignore_tier_does_nothing() {
        let mut node = node();
        assert!(node
            .on_sensor_event(reading(1), 0.5, Duration::from_secs(1))
            .is_empty());
        assert_eq!(node.state(), &NodeState::Idle);
    }

    #[test]
    fn timeout_without_confirmations_drops() {
        let mut node = node();
        let mut timers = Scheduler::new();
        start_cycle(&mut node, &mut timers);
        assert!(node.on_timeout(Duration::from_secs(4)).is_empty());
        assert_eq!(node.state(), &NodeState::Idle);
    }

    #[test]
    fn await_timeout_counts_then_uplinks_at_timeout() {
        let mut node = node();
        let mut timers = Scheduler::new();
        start_cycle(&mut node, &mut timers);

        assert!(node
            .on_verify_response(NodeId(1), EventId(1), Duration::from_millis(1400))
            .is_empty());
        assert!(node
            .on_verify_response(NodeId(2), EventId(1), Duration::from_millis(1500))
            .is_empty());
        assert_eq!(node.confirmations(), Some(2));

        let actions = node.on_timeout(Duration::from_secs(4));
        assert_eq!(
            actions,
            vec![NodeAction::Uplink {
                reading: reading(1),
                used_peer_verification: true
            }]
        );
        assert!(!node.is_awaiting());
    }

    #[test]
    fn first_confirmation_resolves_and_cancels() {
        let mut node = node_with(DetectionConfig {
            resolution_policy: ResolutionPolicy::FirstConfirmation,
            ..Default::default()
        });
        let mut timers = Scheduler::new();
        start_cycle(&mut node, &mut timers);
        let token = match node.state() {
            NodeState::AwaitingVerification {
                timeout: Some(token),
                ..
            } => *token,
            other => panic!("unexpected state {other:?}"),
        };

        let actions = node.on_verify_response(NodeId(2), EventId(1), Duration::from_millis(1400));
        assert_eq!(
            actions,
            vec![
                NodeAction::Uplink {
                    reading: reading(1),
                    used_peer_verification: true
                },
                NodeAction::CancelTimeout { token },
            ]
        );
        assert!(!node.is_awaiting());

        // A second, late confirmation is benign.
        assert_eq!(
            node.on_verify_response(NodeId(1), EventId(1), Duration::from_millis(1500)),
            vec![NodeAction::Discard(DiscardReason::NoVerificationPending)]
        );
    }

    #[test]
    fn second_verify_tier_event_is_suppressed_while_awaiting() {
        let mut node = node();
        let mut timers = Scheduler::new();
        start_cycle(&mut node, &mut timers);
        let before = *node.state();
        let actions = node.on_sensor_event(reading(2), 0.72, Duration::from_secs(2));
        assert_eq!(
            actions,
            vec![NodeAction::Discard(DiscardReason::VerificationInFlight)]
        );
        assert_eq!(node.state(), &before);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn confirm_tier_still_uplinks_while_awaiting() {
        let mut node = node();
        let mut timers = Scheduler::new();
        start_cycle(&mut node, &mut timers);
        let actions = node.on_sensor_event(reading(2), 0.95, Duration::from_secs(2));
        assert_eq!(
            actions,
            vec![NodeAction::Uplink {
                reading: reading(2),
                used_peer_verification: false
            }]
        );
        assert!(node.is_awaiting());
    }

    #[test]
    fn arm_timeout_only_once_per_cycle() {
        let mut node = node();
        let mut timers = Scheduler::new();
        let token = timers.schedule(Duration::from_secs(3), NodeId(0));
        assert!(!node.arm_timeout(token));
        start_cycle(&mut node, &mut timers);
        assert!(!node.arm_timeout(token));
    }

    #[test]
    fn stray_inputs_are_discarded() {
        let mut node = node();
        assert_eq!(
            node.on_verify_response(NodeId(1), EventId(1), Duration::ZERO),
            vec![NodeAction::Discard(DiscardReason::NoVerificationPending)]
        );
        assert_eq!(
            node.on_timeout(Duration::ZERO),
            vec![NodeAction::Discard(DiscardReason::UnexpectedTimeout)]
        );
        assert_eq!(
            node.on_verify_response(NodeId(9), EventId(1), Duration::ZERO),
            vec![NodeAction::Discard(DiscardReason::NotANeighbour)]
        );

        let mut timers = Scheduler::new();
        start_cycle(&mut node, &mut timers);
        assert_eq!(
            node.on_verify_response(NodeId(1), EventId(77), Duration::ZERO),
            vec![NodeAction::Discard(DiscardReason::StaleResponse)]
        );
        assert_eq!(node.confirmations(), Some(0));
    }

    #[test]
    fn verify_request_answers_only_neighbours_at_confirm_tier() {
        let node = node();
        assert_eq!(
            node.on_verify_request(NodeId(1), reading(5), 0.85),
            vec![NodeAction::Send {
                to: NodeId(1),
                message: PeerMessage::VerifyResponse { event_id: EventId(5) }
            }]
        );
        assert!(node.on_verify_request(NodeId(1), reading(5), 0.79).is_empty());
        assert_eq!(
            node.on_verify_request(NodeId(7), reading(5), 0.99),
            vec![NodeAction::Discard(DiscardReason::NotANeighbour)]
        );
        assert_eq!(node.state(), &NodeState::Idle);
    }

    #[test]
    #[tracing_test::traced_test]
    fn decisions_are_logged() {
        let mut node = node();
        node.on_sensor_event(reading(1), 0.75, Duration::from_secs(1));
        node.on_timeout(Duration::from_secs(4));
        assert!(logs_contain("Sensor event scored"));
        assert!(logs_contain("Verification window closed"));
    }

    #[test]
    fn verify_request_leaves_own_cycle_alone() {
        let mut node = node();
        let mut timers = Scheduler::new();
        start_cycle(&mut node, &mut timers);
        let before = *node.state();
        node.on_verify_request(NodeId(2), reading(3), 0.9);
        assert_eq!(node.state(), &before);
    }
}
