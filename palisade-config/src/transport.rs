//! One-hop transport delay configuration.
//!
//! Each verification message is delayed by a uniform draw from its range,
//! emulating radio jitter without modelling the channel.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Inclusive millisecond range.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, Copy, PartialEq, Eq)]
#[validate(schema(function = validation::validate_delay_range))]
pub struct DelayRange {
    #[validate(range(max = 60_000))]
    pub min_ms: u64,
    #[validate(range(max = 60_000))]
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    #[validate(nested)]
    pub request_delay: DelayRange,

    #[validate(nested)]
    pub response_delay: DelayRange,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_delay: DelayRange::new(100, 300),
            response_delay: DelayRange::new(50, 150),
        }
    }
}
