//! Ground-truth dataset configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::Validatable;

/// Parameters for the synthetic ground truth
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Number of change records to generate
    #[serde(default = "default_record_count")]
    pub record_count: i64,

    /// Maximum number of random prefix steps per path
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,

    /// Fixed seed for a reproducible dataset; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            record_count: default_record_count(),
            max_depth: default_max_depth(),
            seed: None,
        }
    }
}

impl Validatable for DatasetConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.record_count < 0 {
            return Err(self.validation_error(format!(
                "record_count must be >= 0, got {}",
                self.record_count
            )));
        }

        if self.max_depth < 1 {
            return Err(self.validation_error(format!(
                "max_depth must be >= 1, got {}",
                self.max_depth
            )));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "dataset"
    }
}

// Default value functions
fn default_record_count() -> i64 {
    60
}

fn default_max_depth() -> i64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_config_defaults() {
        let config = DatasetConfig::default();
        assert_eq!(config.record_count, 60);
        assert_eq!(config.max_depth, 100);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dataset_config_validation() {
        let mut config = DatasetConfig::default();
        config.record_count = 0;
        assert!(config.validate().is_ok());

        config.record_count = -1;
        assert!(config.validate().is_err());

        let mut config = DatasetConfig::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());
    }
}
