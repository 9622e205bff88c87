use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    /// Delays must be finite and non-negative; anything else would corrupt
    /// the queue ordering.
    #[error("Invalid delay: {0} seconds (must be finite and non-negative)")]
    InvalidDelay(f64),
}
