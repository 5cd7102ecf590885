//! Target service configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{
    validate_header_name, validate_port_range, validate_positive, validate_range,
    validate_required_string, validate_url, Validatable,
};

/// Header prefix used to carry observability tags
pub const TAG_HEADER_PREFIX: &str = "x-tag-";

/// Where the simulated clients connect, and how
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Service host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Service port
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket path on the service
    #[serde(default = "default_path")]
    pub path: String,

    /// Use `wss://` instead of `ws://`
    #[serde(default = "crate::domains::utils::default_false")]
    pub secure: bool,

    /// Extra request headers sent with the upgrade request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Observability tags, sent as `x-tag-<name>` headers
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Handshake status that counts as success
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    /// Upper bound on opening one connection
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_connect_timeout"
    )]
    pub connect_timeout: Duration,
}

impl TargetConfig {
    /// Full endpoint URL, e.g. `ws://localhost:8001/documents`
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }

    /// Headers plus tags, in a stable order
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.extend(
            self.tags
                .iter()
                .map(|(k, v)| (format!("{}{}", TAG_HEADER_PREFIX, k), v.clone())),
        );
        headers
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            secure: false,
            headers: BTreeMap::new(),
            tags: BTreeMap::new(),
            expected_status: default_expected_status(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Validatable for TargetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.host, "host", self.domain_name())?;
        validate_port_range(self.port, "port", self.domain_name())?;

        if !self.path.starts_with('/') {
            return Err(self.validation_error(format!(
                "path must start with '/', got '{}'",
                self.path
            )));
        }

        validate_range(self.expected_status, 100, 599, "expected_status", self.domain_name())?;
        validate_positive(
            self.connect_timeout.as_millis(),
            "connect_timeout",
            self.domain_name(),
        )?;

        for (name, _) in self.request_headers() {
            validate_header_name(&name, "header", self.domain_name())?;
        }

        validate_url(&self.url(), "url", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "target"
    }
}

// Default value functions
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_path() -> String {
    "/documents".to_string()
}

fn default_expected_status() -> u16 {
    101 // Switching Protocols
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}
