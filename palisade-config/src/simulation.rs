//! Run-level simulation parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the single sampling stream.
    pub seed: u64,

    /// Logical time after which no action fires (seconds).
    #[validate(range(exclusive_min = 0.0, max = 1.0e9))]
    pub stop_time_secs: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            stop_time_secs: 10_000.0,
        }
    }
}

impl SimulationConfig {
    pub fn stop_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.stop_time_secs).unwrap_or_default()
    }
}
