//! Domain-specific configuration modules

pub mod dataset;
pub mod logging;
pub mod target;
pub mod utils;
pub mod verification;
pub mod worker;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main harness configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    /// Service endpoint configuration
    #[serde(default)]
    pub target: target::TargetConfig,

    /// Ground-truth dataset configuration
    #[serde(default)]
    pub dataset: dataset::DatasetConfig,

    /// Worker population and timing
    #[serde(default)]
    pub worker: worker::WorkerConfig,

    /// Checks and protocol variant switches
    #[serde(default)]
    pub verification: verification::VerificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl HarnessConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.target.validate()?;
        self.dataset.validate()?;
        self.worker.validate()?;
        self.verification.validate()?;
        self.logging.validate()?;

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = HarnessConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
