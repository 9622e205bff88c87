//! # Palisade Configuration System
//!
//! Hierarchical configuration for the perimeter simulation. Every protocol
//! constant (thresholds, timeouts, confidence model, event rates, ring
//! geometry, transport jitter, gateway availability, baseline comparison,
//! seed) is an adjustable parameter here.
//!
//! ## Features
//! - **Unified Configuration**: single source of truth for every crate
//! - **Validation**: range and cross-field checks before a run starts
//! - **Layering**: defaults, then YAML, then `PALISADE_*` environment variables

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod baseline;
mod detection;
mod environment;
mod error;
mod gateway;
mod simulation;
mod telemetry;
mod topology;
mod transport;
mod validation;

pub use baseline::BaselineConfig;
pub use detection::ConfidenceConfig;
pub use detection::DetectionConfig;
pub use detection::ResolutionPolicy;
pub use environment::EnvironmentConfig;
pub use error::ConfigError;
pub use gateway::GatewayConfig;
pub use simulation::SimulationConfig;
pub use telemetry::TelemetryConfig;
pub use topology::TopologyConfig;
pub use transport::DelayRange;
pub use transport::TransportConfig;

/// Default location of the base configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/palisade.yaml";

/// Prefix of environment overrides, e.g. `PALISADE_SIMULATION__SEED=7`.
pub const ENV_PREFIX: &str = "PALISADE_";

/// Selects an extra `config/<profile>.yaml` overlay.
pub const PROFILE_VAR: &str = "PALISADE_PROFILE";

/// Top‑level configuration container for all Palisade components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
#[serde(default)]
pub struct PalisadeConfig {
    /// Tier thresholds, verification timeout and resolution policy.
    #[validate(nested)]
    pub detection: DetectionConfig,

    /// Gaussian confidence proxy parameters.
    #[validate(nested)]
    pub confidence: ConfidenceConfig,

    /// Sensing-event generator parameters.
    #[validate(nested)]
    pub environment: EnvironmentConfig,

    /// Dual-ring placement and peer range.
    #[validate(nested)]
    pub topology: TopologyConfig,

    /// Verification message delays.
    #[validate(nested)]
    pub transport: TransportConfig,

    /// Gateway up/down phases.
    #[validate(nested)]
    pub gateway: GatewayConfig,

    /// Single-threshold comparison detector.
    #[validate(nested)]
    pub baseline: BaselineConfig,

    /// Seed and stop time.
    #[validate(nested)]
    pub simulation: SimulationConfig,

    /// Logging configuration.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl PalisadeConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/palisade.yaml`, if present
    /// 3. `config/<profile>.yaml` when `PALISADE_PROFILE` is set
    /// 4. `PALISADE_*` environment variables (`__` separates sections)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(PalisadeConfig::default()));

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }

        if let Ok(profile) = std::env::var(PROFILE_VAR) {
            let profile_file = format!("config/{profile}.yaml");
            if Path::new(&profile_file).exists() {
                figment = figment.merge(Yaml::file(profile_file));
            }
        }

        Self::extract_validated(figment.merge(env_overrides()))
    }

    /// Load configuration from a specific YAML file layered over defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(PalisadeConfig::default()))
            .merge(Yaml::file(path))
            .merge(env_overrides());
        Self::extract_validated(figment)
    }

    /// `load_from_path` when a path is given, `load` otherwise.
    pub fn load_optional<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    fn extract_validated(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__")
}
