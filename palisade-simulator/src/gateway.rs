//! # Gateway Availability
//!
//! The gateway alternates between up and down phases with exponentially
//! distributed durations, starting up at time zero. Phases are advanced
//! lazily when an uplink asks for the state, so an idle gateway never keeps
//! the scheduler busy after the last sensing event.
//!
//! Phase lengths come from a dedicated stream of the run seed; turning the
//! model on or off leaves every protocol draw unchanged.

use std::time::Duration;

use tracing::debug;

use palisade_config::GatewayConfig;
use palisade_core::SamplingService;

/// ChaCha stream reserved for gateway phase lengths.
pub const GATEWAY_STREAM: u64 = 2;

#[derive(Debug, Clone)]
pub struct Gateway {
    up_mean_secs: f64,
    down_mean_secs: f64,
    sampler: SamplingService,
    up: bool,
    /// `None` once the gateway never changes phase again.
    next_transition: Option<Duration>,
    outages: u64,
}

impl Gateway {
    pub fn new(config: &GatewayConfig, seed: u64) -> Self {
        let mut gateway = Self {
            up_mean_secs: config.up_mean_secs,
            down_mean_secs: config.down_mean_secs,
            sampler: SamplingService::with_stream(seed, GATEWAY_STREAM),
            up: true,
            next_transition: None,
            outages: 0,
        };
        if config.enabled {
            gateway.next_transition = gateway.phase_end(Duration::ZERO);
        }
        gateway
    }

    /// A gateway that never goes down.
    pub fn always_up() -> Self {
        Self::new(
            &GatewayConfig {
                enabled: false,
                ..Default::default()
            },
            0,
        )
    }

    /// Gateway state at `now`. Calls must not go back in time.
    pub fn is_up(&mut self, now: Duration) -> bool {
        while let Some(at) = self.next_transition.filter(|at| *at <= now) {
            self.up = !self.up;
            if !self.up {
                self.outages += 1;
            }
            debug!(up = self.up, at = at.as_secs_f64(), "Gateway phase changed");
            self.next_transition = self.phase_end(at);
        }
        self.up
    }

    /// Down phases entered so far.
    pub fn outages(&self) -> u64 {
        self.outages
    }

    fn phase_end(&mut self, start: Duration) -> Option<Duration> {
        let mean = if self.up {
            self.up_mean_secs
        } else {
            self.down_mean_secs
        };
        let length = Duration::try_from_secs_f64(self.sampler.exponential(mean)).ok()?;
        start.checked_add(length)
    }
}
