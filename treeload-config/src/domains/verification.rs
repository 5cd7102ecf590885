//! Verification and protocol variant switches

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_range, Validatable};

/// Which checks run and which protocol options each worker uses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Record the `all changes received` check at the deadline
    #[serde(default = "crate::domains::utils::default_true")]
    pub verify_completeness: bool,

    /// Record the `changes in ground-truth order` check at the deadline
    #[serde(default = "crate::domains::utils::default_false")]
    pub verify_order: bool,

    /// Send periodic PING messages
    #[serde(default = "crate::domains::utils::default_false")]
    pub enable_heartbeat: bool,

    /// Accept gzip-compressed inbound frames
    #[serde(default = "crate::domains::utils::default_true")]
    pub compressed_payloads: bool,

    /// Batch size hint carried by the CONNECT message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,

    /// Minimum aggregate pass rate for the run to succeed
    #[serde(default = "default_min_pass_rate")]
    pub min_pass_rate: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            verify_completeness: true,
            verify_order: false,
            enable_heartbeat: false,
            compressed_payloads: true,
            batch_size: None,
            min_pass_rate: default_min_pass_rate(),
        }
    }
}

impl Validatable for VerificationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_range(self.min_pass_rate, 0.0, 1.0, "min_pass_rate", self.domain_name())?;

        if let Some(batch_size) = self.batch_size {
            validate_positive(batch_size, "batch_size", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "verification"
    }
}

fn default_min_pass_rate() -> f64 {
    1.0
}
