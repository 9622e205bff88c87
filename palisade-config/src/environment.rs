//! Sensing-event generator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Parameters of the event environment: how many events, how often, where,
/// and which nodes perceive them.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Number of sensing events generated over the run.
    #[validate(range(max = 10_000_000))]
    pub total_events: u64,

    /// Probability that a generated event is a real intruder.
    #[validate(range(min = 0.0, max = 1.0))]
    pub intruder_probability: f64,

    /// Mean of the exponential inter-arrival time (seconds).
    #[validate(range(exclusive_min = 0.0, max = 86_400.0))]
    pub mean_interval_secs: f64,

    /// Logical time of the first event (seconds).
    #[validate(range(min = 0.0, max = 86_400.0))]
    pub start_delay_secs: f64,

    /// Events land uniformly in `[-extent, extent]` on both axes (metres).
    #[validate(range(exclusive_min = 0.0, max = 100_000.0))]
    pub area_half_extent: f64,

    /// Nodes within this distance of an event perceive it (metres).
    #[validate(range(min = 0.0, max = 100_000.0))]
    pub sensor_range: f64,

    /// Fixed delay between an event and its delivery to a node.
    #[validate(range(max = 60_000))]
    pub processing_delay_ms: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            total_events: 1000,
            intruder_probability: 0.30,
            mean_interval_secs: 8.0,
            start_delay_secs: 1.0,
            area_half_extent: 25.0,
            sensor_range: 15.0,
            processing_delay_ms: 10,
        }
    }
}

impl EnvironmentConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.start_delay_secs).unwrap_or_default()
    }
}
