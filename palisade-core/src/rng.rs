//! ## palisade-core::rng
//! **Seeded sampling service**
//!
//! One `ChaCha8Rng` stream drives every protocol draw in a run: confidence
//! scores, event arrivals, event positions, ground truth and transport jitter.
//! Auxiliary models (comparison baselines, gateway availability) take their
//! own stream of the same seed via [`SamplingService::with_stream`], so
//! enabling them never shifts the protocol draws.
//! ChaCha output is portable, so a seed reproduces the same run on any host.
//!
//! Inputs are never trusted to be well formed. Degenerate parameters degrade
//! to a deterministic value instead of panicking.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Normal};

/// Process-wide random stream for a single simulation run.
#[derive(Debug, Clone)]
pub struct SamplingService {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SamplingService {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Same seed, independent ChaCha stream. Stream `0` is [`SamplingService::new`].
    pub fn with_stream(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self { seed, rng }
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws from `N(mean, std_dev)` and clamps into `[0, 1]`.
    ///
    /// An invalid standard deviation (negative or non-finite) or a non-finite
    /// mean skips the draw and returns the clamped mean.
    pub fn gaussian_clamped(&mut self, mean: f64, std_dev: f64) -> f64 {
        let raw = match Normal::new(mean, std_dev) {
            Ok(normal) if mean.is_finite() && std_dev.is_finite() => normal.sample(&mut self.rng),
            _ => mean,
        };
        clamp_unit(raw)
    }

    /// Draws from an exponential distribution with the given mean.
    ///
    /// Returns `0.0` without consuming the stream when `mean` is not a
    /// positive finite number.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        if !(mean.is_finite() && mean > 0.0) {
            return 0.0;
        }
        match Exp::new(1.0 / mean) {
            Ok(exp) => exp.sample(&mut self.rng),
            Err(_) => 0.0,
        }
    }

    /// `true` with probability `p`. Always consumes exactly one draw.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        let u: f64 = self.rng.random();
        u < p
    }

    /// Uniform real in `[low, high)`. Returns `low` for an empty range.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return low;
        }
        self.rng.random_range(low..high)
    }

    /// Uniform whole-millisecond duration in `[min_ms, max_ms]`.
    pub fn uniform_millis(&mut self, min_ms: u64, max_ms: u64) -> Duration {
        if min_ms >= max_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(self.rng.random_range(min_ms..=max_ms))
    }
}

#[inline]
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SamplingService::new(7);
        let mut b = SamplingService::new(7);
        for _ in 0..100 {
            assert_eq!(
                a.gaussian_clamped(0.5, 0.2).to_bits(),
                b.gaussian_clamped(0.5, 0.2).to_bits()
            );
            assert_eq!(a.exponential(8.0).to_bits(), b.exponential(8.0).to_bits());
            assert_eq!(a.bernoulli(0.3), b.bernoulli(0.3));
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut main = SamplingService::new(7);
        let mut default_stream = SamplingService::with_stream(7, 0);
        let mut side = SamplingService::with_stream(7, 1);
        let a: Vec<u64> = (0..16).map(|_| main.exponential(1.0).to_bits()).collect();
        let b: Vec<u64> = (0..16).map(|_| default_stream.exponential(1.0).to_bits()).collect();
        let c: Vec<u64> = (0..16).map(|_| side.exponential(1.0).to_bits()).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(side.seed(), 7);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SamplingService::new(1);
        let mut b = SamplingService::new(2);
        let left: Vec<u64> = (0..16).map(|_| a.exponential(1.0).to_bits()).collect();
        let right: Vec<u64> = (0..16).map(|_| b.exponential(1.0).to_bits()).collect();
        assert_ne!(left, right);
    }

    #[test]
    fn gaussian_degenerate_inputs_stay_in_unit_interval() {
        let mut sampler = SamplingService::new(3);
        assert_eq!(sampler.gaussian_clamped(0.4, -1.0), 0.4);
        assert_eq!(sampler.gaussian_clamped(f64::NAN, 0.1), 0.0);
        assert_eq!(sampler.gaussian_clamped(f64::INFINITY, 0.1), 1.0);
        assert_eq!(sampler.gaussian_clamped(0.2, f64::INFINITY), 0.2);
        assert_eq!(sampler.gaussian_clamped(0.9, 0.0), 0.9);
    }

    #[test]
    fn exponential_rejects_bad_mean() {
        let mut sampler = SamplingService::new(3);
        assert_eq!(sampler.exponential(0.0), 0.0);
        assert_eq!(sampler.exponential(-2.0), 0.0);
        assert_eq!(sampler.exponential(f64::NAN), 0.0);
    }

    #[test]
    fn exponential_mean_is_close() {
        let mut sampler = SamplingService::new(11);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| sampler.exponential(8.0)).sum();
        let mean = total / n as f64;
        assert!((mean - 8.0).abs() < 0.4, "mean was {mean}");
    }

    #[test]
    fn bernoulli_edges() {
        let mut sampler = SamplingService::new(5);
        for _ in 0..1000 {
            assert!(sampler.bernoulli(1.0));
            assert!(!sampler.bernoulli(0.0));
        }
    }

    #[test]
    fn uniform_millis_bounds() {
        let mut sampler = SamplingService::new(9);
        for _ in 0..1000 {
            let d = sampler.uniform_millis(100, 300);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(300));
        }
        assert_eq!(sampler.uniform_millis(50, 50), Duration::from_millis(50));
    }

    #[test]
    fn uniform_empty_range_returns_low() {
        let mut sampler = SamplingService::new(9);
        assert_eq!(sampler.uniform(2.0, 2.0), 2.0);
        assert_eq!(sampler.uniform(3.0, 1.0), 3.0);
        let v = sampler.uniform(-25.0, 25.0);
        assert!((-25.0..25.0).contains(&v));
    }
}
