//! Gateway availability model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Alternating up/down phases with exponential durations. The gateway
/// starts up. Uplinks sent during a down phase are still counted, tagged as
/// outage detections.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// `false` keeps the gateway up for the whole run.
    pub enabled: bool,

    #[validate(range(exclusive_min = 0.0, max = 1.0e9))]
    pub up_mean_secs: f64,

    #[validate(range(exclusive_min = 0.0, max = 1.0e9))]
    pub down_mean_secs: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            up_mean_secs: 1800.0,
            down_mean_secs: 300.0,
        }
    }
}
