//! # palisade-core
//!
//! Deterministic execution primitives for the perimeter simulation.
//!
//! ### Expectations:
//! - Same seed, same call order, same output: bit for bit
//! - No wall-clock reads anywhere in the core
//! - Single writer at a time; no locks on the hot path
//!
//! ### Key Submodules:
//! - `rng`: seeded sampling service (Gaussian, exponential, Bernoulli, uniform)
//! - `scheduler`: logical clock + time-ordered action queue with cancellation
//! - `error`: shared error types

pub mod error;
pub mod rng;
pub mod scheduler;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::rng::*;
    pub use crate::scheduler::*;
}

pub use error::SchedulerError;
pub use rng::SamplingService;
pub use scheduler::{Scheduler, SchedulerStats, TimerToken};
