//! Configuration loading and environment variable handling

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::HarnessConfig;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "TREELOAD".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<HarnessConfig> {
        let content = std::fs::read_to_string(path)?;
        self.from_yaml_str(&content)
    }

    /// Load configuration from YAML text with environment overrides
    pub fn from_yaml_str(&self, content: &str) -> ConfigResult<HarnessConfig> {
        let mut config: HarnessConfig = serde_yaml::from_str(content)?;

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<HarnessConfig> {
        let mut config = HarnessConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<HarnessConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut HarnessConfig) -> ConfigResult<()> {
        self.apply_target_overrides(&mut config.target)?;
        self.apply_dataset_overrides(&mut config.dataset)?;
        self.apply_worker_overrides(&mut config.worker)?;
        self.apply_verification_overrides(&mut config.verification)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply target config overrides
    fn apply_target_overrides(
        &self,
        config: &mut crate::domains::target::TargetConfig,
    ) -> ConfigResult<()> {
        if let Ok(host) = self.get_env_var("TARGET_HOST") {
            config.host = host;
        }

        if let Some(port) = self.parse_env_var("TARGET_PORT")? {
            config.port = port;
        }

        if let Ok(path) = self.get_env_var("TARGET_PATH") {
            config.path = path;
        }

        if let Some(secure) = self.parse_env_var("TARGET_SECURE")? {
            config.secure = secure;
        }

        if let Some(millis) = self.parse_env_var::<u64>("CONNECT_TIMEOUT_MS")? {
            config.connect_timeout = Duration::from_millis(millis);
        }

        Ok(())
    }

    /// Apply dataset config overrides
    fn apply_dataset_overrides(
        &self,
        config: &mut crate::domains::dataset::DatasetConfig,
    ) -> ConfigResult<()> {
        if let Some(count) = self.parse_env_var("RECORD_COUNT")? {
            config.record_count = count;
        }

        if let Some(depth) = self.parse_env_var("MAX_DEPTH")? {
            config.max_depth = depth;
        }

        if let Some(seed) = self.parse_env_var("SEED")? {
            config.seed = Some(seed);
        }

        Ok(())
    }

    /// Apply worker config overrides
    fn apply_worker_overrides(
        &self,
        config: &mut crate::domains::worker::WorkerConfig,
    ) -> ConfigResult<()> {
        if let Some(population) = self.parse_env_var("POPULATION")? {
            config.population = population;
        }

        if let Some(millis) = self.parse_env_var::<u64>("DEADLINE_MS")? {
            config.deadline = Duration::from_millis(millis);
        }

        if let Some(millis) = self.parse_env_var::<u64>("HEARTBEAT_INTERVAL_MS")? {
            config.heartbeat_interval = Duration::from_millis(millis);
        }

        if let Some(batches) = self.parse_env_var("SEND_BATCHES")? {
            config.send_batches = batches;
        }

        Ok(())
    }

    /// Apply verification config overrides
    fn apply_verification_overrides(
        &self,
        config: &mut crate::domains::verification::VerificationConfig,
    ) -> ConfigResult<()> {
        if let Some(enabled) = self.parse_env_var("ENABLE_HEARTBEAT")? {
            config.enable_heartbeat = enabled;
        }

        if let Some(enabled) = self.parse_env_var("VERIFY_COMPLETENESS")? {
            config.verify_completeness = enabled;
        }

        if let Some(enabled) = self.parse_env_var("VERIFY_ORDER")? {
            config.verify_order = enabled;
        }

        if let Some(enabled) = self.parse_env_var("COMPRESSED_PAYLOADS")? {
            config.compressed_payloads = enabled;
        }

        if let Some(batch_size) = self.parse_env_var("BATCH_SIZE")? {
            config.batch_size = Some(batch_size);
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Parse an optional environment variable, failing on malformed values
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
