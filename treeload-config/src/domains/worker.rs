//! Worker population and timing configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

/// How many workers run and how each one paces itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of workers; each runs exactly once
    #[serde(default = "default_population")]
    pub population: u32,

    /// Lower bound of the randomized send delay
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_send_delay_min"
    )]
    pub send_delay_min: Duration,

    /// Upper bound of the randomized send delay
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_send_delay_max"
    )]
    pub send_delay_max: Duration,

    /// Number of CHANGES messages the shard is split into
    #[serde(default = "default_send_batches")]
    pub send_batches: u32,

    /// Gap between consecutive CHANGES batches
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_batch_spacing"
    )]
    pub batch_spacing: Duration,

    /// PING period when heartbeating is enabled
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_heartbeat_interval"
    )]
    pub heartbeat_interval: Duration,

    /// Total run length of one worker, measured from its start
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_deadline"
    )]
    pub deadline: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            population: default_population(),
            send_delay_min: default_send_delay_min(),
            send_delay_max: default_send_delay_max(),
            send_batches: default_send_batches(),
            batch_spacing: default_batch_spacing(),
            heartbeat_interval: default_heartbeat_interval(),
            deadline: default_deadline(),
        }
    }
}

impl Validatable for WorkerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.population, "population", self.domain_name())?;
        validate_positive(self.send_batches, "send_batches", self.domain_name())?;
        validate_positive(
            self.heartbeat_interval.as_millis(),
            "heartbeat_interval",
            self.domain_name(),
        )?;
        validate_positive(self.deadline.as_millis(), "deadline", self.domain_name())?;

        if self.send_delay_min > self.send_delay_max {
            return Err(self.validation_error(format!(
                "send_delay_min ({:?}) must not exceed send_delay_max ({:?})",
                self.send_delay_min, self.send_delay_max
            )));
        }

        if self.send_delay_max >= self.deadline {
            tracing::warn!(
                "send_delay_max {:?} is not below the deadline {:?}; some workers will never send",
                self.send_delay_max,
                self.deadline
            );
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "worker"
    }
}

// Default value functions
fn default_population() -> u32 {
    100
}

fn default_send_delay_min() -> Duration {
    Duration::from_millis(500)
}

fn default_send_delay_max() -> Duration {
    Duration::from_millis(3000)
}

fn default_send_batches() -> u32 {
    1
}

fn default_batch_spacing() -> Duration {
    Duration::from_secs(1)
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_deadline() -> Duration {
    Duration::from_secs(8)
}
