//! # Transport Models
//!
//! One-hop delivery delay for verification messages. Delivery itself is a
//! scheduled action; nothing is ever lost.
//!
//! ## Models:
//! - `UniformJitterTransport`: uniform whole-millisecond delay per message kind
//! - `FixedTransport`: the same delay for every message

use std::fmt;
use std::time::Duration;

use palisade_config::{DelayRange, TransportConfig};
use palisade_core::SamplingService;
use palisade_detection::PeerMessage;

pub trait TransportModel: fmt::Debug + Send + Sync {
    /// Delay before `message` reaches its destination.
    fn delay(&self, message: &PeerMessage, sampler: &mut SamplingService) -> Duration;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformJitterTransport {
    request: DelayRange,
    response: DelayRange,
}

impl UniformJitterTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            request: config.request_delay,
            response: config.response_delay,
        }
    }
}

impl TransportModel for UniformJitterTransport {
    #[inline]
    fn delay(&self, message: &PeerMessage, sampler: &mut SamplingService) -> Duration {
        let range = match message {
            PeerMessage::VerifyRequest { .. } => self.request,
            PeerMessage::VerifyResponse { .. } => self.response,
        };
        sampler.uniform_millis(range.min_ms, range.max_ms)
    }
}

/// Consumes no randomness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTransport(pub Duration);

impl TransportModel for FixedTransport {
    #[inline]
    fn delay(&self, _message: &PeerMessage, _sampler: &mut SamplingService) -> Duration {
        self.0
    }
}
