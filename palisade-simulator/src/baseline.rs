//! # Baseline Detector
//!
//! A naive single-threshold alarm for comparison: every generated event is
//! scored once with the configured Gaussian confidence model and raises an
//! alert when the score is strictly above the threshold. No tiers, no peer
//! verification, no timeouts.
//!
//! Scores come from a dedicated stream of the run seed, so the comparison
//! never perturbs the protocol's own draws.

use palisade_config::{BaselineConfig, ConfidenceConfig};
use palisade_core::SamplingService;

/// ChaCha stream reserved for baseline scores.
pub const BASELINE_STREAM: u64 = 1;

#[derive(Debug, Clone)]
pub struct BaselineDetector {
    threshold: f64,
    intruder: (f64, f64),
    noise: (f64, f64),
    sampler: SamplingService,
}

impl BaselineDetector {
    pub fn new(config: &BaselineConfig, confidence: &ConfidenceConfig, seed: u64) -> Self {
        Self {
            threshold: config.threshold,
            intruder: (confidence.intruder_mean, confidence.intruder_std),
            noise: (confidence.noise_mean, confidence.noise_std),
            sampler: SamplingService::with_stream(seed, BASELINE_STREAM),
        }
    }

    /// Scores one event. Returns whether the baseline would alert.
    pub fn alerts(&mut self, is_intruder: bool) -> bool {
        let (mean, std_dev) = if is_intruder { self.intruder } else { self.noise };
        self.sampler.gaussian_clamped(mean, std_dev) > self.threshold
    }
}
