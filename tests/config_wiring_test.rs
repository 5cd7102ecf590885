//! Configuration flowing through to a finished run

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use treeload_config::{ConfigLoader, HarnessConfig};
use treeload_execution::{
    LoopbackHub, Orchestrator, WorkerSettings, COMPLETENESS_CHECK, ORDER_CHECK,
};

const HARNESS_YAML: &str = r#"
target:
  host: sync.internal
  port: 8001
  path: /documents
  tags:
    my_tag: hello
  expected_status: 101
dataset:
  record_count: 18
  max_depth: 6
  seed: 99
worker:
  population: 4
  send_delay_min: 100
  send_delay_max: 900
  send_batches: 3
  batch_spacing: 200
  heartbeat_interval: 500
  deadline: 4000
verification:
  verify_completeness: true
  verify_order: true
  enable_heartbeat: true
  compressed_payloads: false
  batch_size: 50
  min_pass_rate: 0.9
"#;

fn load(yaml: &str) -> HarnessConfig {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    temp_env::with_vars_unset(
        [
            "TREELOAD_POPULATION",
            "TREELOAD_RECORD_COUNT",
            "TREELOAD_DEADLINE_MS",
            "TREELOAD_ENABLE_HEARTBEAT",
        ],
        || ConfigLoader::new().from_file(file.path()).unwrap(),
    )
}

#[test]
fn test_yaml_reaches_worker_settings() {
    let config = load(HARNESS_YAML);
    let settings = WorkerSettings::from_config(&config);

    assert_eq!(settings.expected_status, 101);
    assert_eq!(settings.batch_size, Some(50));
    assert_eq!(settings.send_batches, 3);
    assert_eq!(settings.batch_spacing, Duration::from_millis(200));
    assert_eq!(settings.heartbeat_interval, Some(Duration::from_millis(500)));
    assert_eq!(settings.deadline, Duration::from_secs(4));
    assert!(settings.verify_order);
    assert!(!settings.compressed_payloads);
    assert_eq!(settings.status_check_name(), "status is 101");
}

#[tokio::test(start_paused = true)]
async fn test_configured_run_against_loopback() {
    let config = load(HARNESS_YAML);
    let dataset = Orchestrator::prepare_dataset(&config.dataset).unwrap();
    assert_eq!(dataset.len(), 18);
    assert!(dataset.is_sorted());

    let hub = LoopbackHub::new(config.verification.compressed_payloads);
    let orchestrator = Orchestrator::from_config(&config, Arc::new(hub.clone())).unwrap();
    assert_eq!(orchestrator.population(), 4);

    let summary = orchestrator.run(dataset).await.unwrap();

    assert_eq!(summary.workers_completed, 4);
    assert_eq!(summary.checks[COMPLETENESS_CHECK].passes, 4);
    assert_eq!(summary.checks[ORDER_CHECK].passes, 4);
    assert!(summary.meets(config.verification.min_pass_rate));
    // Three batches per worker, every shard non-empty
    assert_eq!(hub.stats().changes_messages, 12);
}

#[test]
fn test_same_seed_same_ground_truth() {
    let config = load(HARNESS_YAML);
    let first = Orchestrator::prepare_dataset(&config.dataset).unwrap();
    let second = Orchestrator::prepare_dataset(&config.dataset).unwrap();
    assert_eq!(first.records(), second.records());
}

#[test]
fn test_invalid_file_never_reaches_orchestrator() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"worker:\n  population: 0\n").unwrap();

    let err = temp_env::with_vars_unset(["TREELOAD_POPULATION"], || {
        ConfigLoader::new().from_file(file.path()).unwrap_err()
    });
    assert!(err.to_string().contains("population"));

    let mut config = HarnessConfig::default();
    config.worker.population = 0;
    let err = Orchestrator::from_config(&config, Arc::new(LoopbackHub::default()))
        .err()
        .unwrap();
    assert!(err.is_configuration());
}

#[test]
fn test_env_overrides_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(HARNESS_YAML.as_bytes()).unwrap();

    let config = temp_env::with_vars(
        [("TREELOAD_POPULATION", Some("9")), ("TREELOAD_DEADLINE_MS", Some("2500"))],
        || ConfigLoader::new().from_file(file.path()).unwrap(),
    );
    assert_eq!(config.worker.population, 9);
    assert_eq!(config.worker.deadline, Duration::from_millis(2500));
    assert_eq!(config.dataset.record_count, 18);
}
