//! Node decision policy and confidence model configuration.
//!
//! Defines the tier thresholds each perimeter node applies to a sensing
//! event, the verification timeout, and the Gaussian confidence proxy that
//! stands in for the on-node image classifier.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// How a node awaiting peer verification resolves once a confirmation
/// arrives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Confirmations only accumulate; the uplink decision waits for the
    /// full timeout window.
    #[default]
    AwaitTimeout,
    /// The first confirmation emits the uplink and cancels the timeout.
    FirstConfirmation,
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPolicy::AwaitTimeout => f.write_str("await_timeout"),
            ResolutionPolicy::FirstConfirmation => f.write_str("first_confirmation"),
        }
    }
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "await_timeout" => Ok(ResolutionPolicy::AwaitTimeout),
            "first_confirmation" => Ok(ResolutionPolicy::FirstConfirmation),
            other => Err(format!(
                "unknown resolution policy '{other}' (expected await_timeout or first_confirmation)"
            )),
        }
    }
}

/// Tiered decision parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[validate(schema(function = validation::validate_thresholds))]
#[serde(default)]
pub struct DetectionConfig {
    /// Confidence at or above which a node reports immediately (tier 1).
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub confirm_threshold: f64,

    /// Confidence at or above which a node asks its peers (tier 2).
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub verify_threshold: f64,

    /// How long a node waits for peer confirmations (seconds).
    #[validate(range(exclusive_min = 0.0, max = 3600.0))]
    pub verification_timeout_secs: f64,

    /// What a verify-response does to a node awaiting verification.
    pub resolution_policy: ResolutionPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confirm_threshold: 0.80,
            verify_threshold: 0.70,
            verification_timeout_secs: 3.0,
            resolution_policy: ResolutionPolicy::AwaitTimeout,
        }
    }
}

impl DetectionConfig {
    pub fn verification_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.verification_timeout_secs).unwrap_or_default()
    }
}

/// Gaussian confidence proxy, one `(mean, std)` pair per ground truth.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct ConfidenceConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub intruder_mean: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub intruder_std: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_mean: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_std: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            intruder_mean: 0.85,
            intruder_std: 0.08,
            noise_mean: 0.35,
            noise_std: 0.15,
        }
    }
}
