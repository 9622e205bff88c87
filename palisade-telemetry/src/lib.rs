//! # Palisade Telemetry
//!
//! Run statistics, structured logging and Prometheus export.

pub mod logging;
pub mod metrics;
pub mod statistics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
pub use statistics::{BaselineSummary, SimulationStatistics, StatisticsSummary};
