//! ## palisade-detection::confidence
//! **Stand-in for the on-node image classifier**
//!
//! A node never sees pixels. It gets a score in `[0, 1]` drawn from a model
//! keyed on ground truth, which approximates a classifier's accuracy profile.

use std::collections::BTreeMap;
use std::fmt;

use palisade_config::ConfidenceConfig;
use palisade_core::SamplingService;

use crate::types::NodeId;

/// Produces a confidence score for one (node, event) pair.
pub trait ConfidenceModel: fmt::Debug + Send + Sync {
    fn score(&self, node: NodeId, is_intruder: bool, sampler: &mut SamplingService) -> f64;
}

/// Clamped Gaussian with separate parameters for intruders and noise.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianConfidence {
    intruder: (f64, f64),
    noise: (f64, f64),
}

impl GaussianConfidence {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            intruder: (config.intruder_mean, config.intruder_std),
            noise: (config.noise_mean, config.noise_std),
        }
    }
}

impl Default for GaussianConfidence {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}

impl ConfidenceModel for GaussianConfidence {
    fn score(&self, _node: NodeId, is_intruder: bool, sampler: &mut SamplingService) -> f64 {
        let (mean, std_dev) = if is_intruder { self.intruder } else { self.noise };
        sampler.gaussian_clamped(mean, std_dev)
    }
}

/// Scripted scores per node. Consumes no randomness.
///
/// Used to force a node into a specific tier.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedConfidence {
    default: f64,
    per_node: BTreeMap<NodeId, f64>,
}

impl FixedConfidence {
    /// Every node scores `value`.
    pub fn uniform(value: f64) -> Self {
        Self {
            default: clamp_score(value),
            per_node: BTreeMap::new(),
        }
    }

    /// Overrides the score of a single node.
    pub fn with_node(mut self, node: NodeId, value: f64) -> Self {
        self.per_node.insert(node, clamp_score(value));
        self
    }
}

impl ConfidenceModel for FixedConfidence {
    fn score(&self, node: NodeId, _is_intruder: bool, _sampler: &mut SamplingService) -> f64 {
        self.per_node.get(&node).copied().unwrap_or(self.default)
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
