//! Custom validation functions for configuration.
//!
//! Cross-field rules that `#[validate(range(..))]` cannot express.

use validator::ValidationError;

use crate::detection::DetectionConfig;
use crate::transport::DelayRange;

/// The confirm tier must sit strictly above the verify tier.
pub fn validate_thresholds(config: &DetectionConfig) -> Result<(), ValidationError> {
    if config.confirm_threshold > config.verify_threshold {
        Ok(())
    } else {
        Err(ValidationError::new("confirm_must_exceed_verify")
            .with_message("confirm_threshold must be greater than verify_threshold".into()))
    }
}

pub fn validate_delay_range(range: &DelayRange) -> Result<(), ValidationError> {
    if range.min_ms <= range.max_ms {
        Ok(())
    } else {
        Err(ValidationError::new("inverted_delay_range")
            .with_message("min_ms must not exceed max_ms".into()))
    }
}

/// Validate a tracing level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error", "off"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
