//! Integration tests for treeload-config

use std::io::Write;
use std::time::Duration;

use temp_env::with_vars;
use treeload_config::domains::logging::{LogFormat, LogLevel};
use treeload_config::*;

#[test]
fn test_default_config_validation() {
    let config = HarnessConfig::default();
    assert!(config.validate_all().is_ok());
    assert_eq!(config.target.url(), "ws://localhost:8001/documents");
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("TREELOAD_TARGET_HOST", Some("sync.local")),
        ("TREELOAD_TARGET_PORT", Some("9100")),
        ("TREELOAD_POPULATION", Some("25")),
        ("TREELOAD_RECORD_COUNT", Some("5")),
        ("TREELOAD_MAX_DEPTH", Some("3")),
        ("TREELOAD_DEADLINE_MS", Some("1500")),
        ("TREELOAD_ENABLE_HEARTBEAT", Some("true")),
        ("TREELOAD_LOG_LEVEL", Some("debug")),
        ("TREELOAD_LOG_FORMAT", Some("json")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.target.url(), "ws://sync.local:9100/documents");
        assert_eq!(config.worker.population, 25);
        assert_eq!(config.dataset.record_count, 5);
        assert_eq!(config.dataset.max_depth, 3);
        assert_eq!(config.worker.deadline, Duration::from_millis(1500));
        assert!(config.verification.enable_heartbeat);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    });
}

#[test]
fn test_malformed_env_value_is_rejected() {
    with_vars(vec![("TREELOAD_POPULATION", Some("lots"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(_)));
    });
}

#[test]
fn test_negative_record_count_from_env_fails_validation() {
    with_vars(vec![("TREELOAD_RECORD_COUNT", Some("-1"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        match err {
            ConfigError::DomainError { domain, .. } => assert_eq!(domain, "dataset"),
            other => panic!("unexpected error: {other}"),
        }
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("LOADTEST_POPULATION", Some("7"))], || {
        let config = ConfigLoader::with_prefix("LOADTEST").from_env().unwrap();
        assert_eq!(config.worker.population, 7);
    });
}

#[test]
fn test_yaml_config_serialization() {
    let config = HarnessConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();

    // Parse it back
    let parsed: HarnessConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
    assert_eq!(parsed.worker.deadline, config.worker.deadline);
    assert_eq!(parsed.target.port, config.target.port);
}

#[test]
fn test_generate_sample_parses() {
    let sample = HarnessConfig::generate_sample();
    let parsed: HarnessConfig = serde_yaml::from_str(&sample).unwrap();
    assert!(parsed.validate_all().is_ok());
}

#[test]
fn test_comprehensive_config_file() {
    let yaml = r#"
target:
  host: "127.0.0.1"
  port: 8001
  path: "/documents"
  tags:
    my_tag: hello
  connect_timeout: 2000

dataset:
  record_count: 60
  max_depth: 100
  seed: 42

worker:
  population: 10
  send_delay_min: 500
  send_delay_max: 3000
  send_batches: 6
  batch_spacing: 1000
  deadline: 8000

verification:
  verify_order: true
  enable_heartbeat: true
  batch_size: 10
  min_pass_rate: 0.95

logging:
  level: warn
  format: compact
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = temp_env::with_vars_unset(
        vec!["TREELOAD_POPULATION", "TREELOAD_LOG_LEVEL", "TREELOAD_SEED"],
        || ConfigLoader::new().from_file(file.path()).unwrap(),
    );

    assert_eq!(config.target.host, "127.0.0.1");
    assert_eq!(
        config.target.request_headers(),
        vec![("x-tag-my_tag".to_string(), "hello".to_string())]
    );
    assert_eq!(config.target.connect_timeout, Duration::from_secs(2));
    assert_eq!(config.dataset.seed, Some(42));
    assert_eq!(config.worker.population, 10);
    assert_eq!(config.worker.send_batches, 6);
    assert_eq!(config.worker.batch_spacing, Duration::from_secs(1));
    assert!(config.verification.verify_order);
    assert!(config.verification.verify_completeness);
    assert_eq!(config.verification.batch_size, Some(10));
    assert_eq!(config.verification.min_pass_rate, 0.95);
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
fn test_env_overrides_file_values() {
    let yaml = "worker:\n  population: 10\n";
    with_vars(vec![("TREELOAD_POPULATION", Some("3"))], || {
        let config = ConfigLoader::new().from_yaml_str(yaml).unwrap();
        assert_eq!(config.worker.population, 3);
    });
}

#[test]
fn test_invalid_yaml_is_parse_error() {
    let err = ConfigLoader::new()
        .from_yaml_str("worker: [not, a, map")
        .unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn test_missing_file_is_read_error() {
    let err = ConfigLoader::new()
        .load(Some("/nonexistent/treeload.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileReadError(_)));
}
