//! Naive single-threshold comparison detector.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Scores every generated event once with the confidence model and alerts
/// when the score is strictly above `threshold`. No tiers, no verification.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct BaselineConfig {
    pub enabled: bool,

    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.50,
        }
    }
}
