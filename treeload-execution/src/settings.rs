//! Per-worker settings resolved from the harness configuration

use std::time::Duration;

use rand::Rng;
use treeload_config::HarnessConfig;

/// Everything a worker needs to know about timing, protocol options and checks
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    /// Handshake status that counts as success
    pub expected_status: u16,
    /// Batch size hint sent with CONNECT
    pub batch_size: Option<u32>,
    pub send_delay_min: Duration,
    pub send_delay_max: Duration,
    pub send_batches: u32,
    pub batch_spacing: Duration,
    /// PING period, `None` when heartbeating is disabled
    pub heartbeat_interval: Option<Duration>,
    pub deadline: Duration,
    pub verify_completeness: bool,
    pub verify_order: bool,
    pub compressed_payloads: bool,
}

impl WorkerSettings {
    pub fn from_config(config: &HarnessConfig) -> Self {
        let verification = &config.verification;
        Self {
            expected_status: config.target.expected_status,
            batch_size: verification.batch_size,
            send_delay_min: config.worker.send_delay_min,
            send_delay_max: config.worker.send_delay_max,
            send_batches: config.worker.send_batches,
            batch_spacing: config.worker.batch_spacing,
            heartbeat_interval: verification
                .enable_heartbeat
                .then_some(config.worker.heartbeat_interval),
            deadline: config.worker.deadline,
            verify_completeness: verification.verify_completeness,
            verify_order: verification.verify_order,
            compressed_payloads: verification.compressed_payloads,
        }
    }

    /// Draw a send delay uniformly from `send_delay_min..=send_delay_max`
    pub fn draw_send_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.send_delay_min.as_millis() as u64;
        let max = self.send_delay_max.as_millis() as u64;
        if max <= min {
            return self.send_delay_min;
        }
        Duration::from_millis(rng.gen_range(min..=max))
    }

    /// Name of the handshake check, e.g. `status is 101`
    pub fn status_check_name(&self) -> String {
        format!("status is {}", self.expected_status)
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_default_config() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.expected_status, 101);
        assert_eq!(settings.heartbeat_interval, None);
        assert_eq!(settings.deadline, Duration::from_secs(8));
        assert!(settings.verify_completeness);
        assert_eq!(settings.status_check_name(), "status is 101");
    }

    #[test]
    fn test_heartbeat_enabled() {
        let mut config = HarnessConfig::default();
        config.verification.enable_heartbeat = true;
        let settings = WorkerSettings::from_config(&config);
        assert_eq!(settings.heartbeat_interval, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_send_delay_within_bounds() {
        let settings = WorkerSettings::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let delay = settings.draw_send_delay(&mut rng);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_fixed_send_delay() {
        let settings = WorkerSettings {
            send_delay_min: Duration::from_millis(250),
            send_delay_max: Duration::from_millis(250),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(settings.draw_send_delay(&mut rng), Duration::from_millis(250));
    }
}
