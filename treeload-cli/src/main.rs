use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use treeload_config::domains::logging::LogLevel;
use treeload_config::{ConfigLoader, HarnessConfig};
use treeload_execution::{Connector, LoopbackHub, Orchestrator, WebSocketConnector};
use treeload_logging::{init_logging_from_config, init_simple_tracing};

mod cli;
use cli::{Cli, Commands, ConfigCommands, RunArgs};

/// Exit status when the run completed below the pass-rate threshold
const EXIT_BELOW_THRESHOLD: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = load_config(cli.config.as_ref())?;
            apply_log_level(&mut config, cli.log_level.as_deref())?;
            apply_run_overrides(&mut config, &args);
            config
                .validate_all()
                .context("Invalid configuration after command-line overrides")?;

            init_logging_from_config(&config.logging)?;
            if handle_run(config, &args).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_BELOW_THRESHOLD))
            }
        }
        Commands::Generate {
            records,
            max_depth,
            seed,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;

            if let Some(records) = records {
                config.dataset.record_count = records;
            }
            if let Some(max_depth) = max_depth {
                config.dataset.max_depth = max_depth;
            }
            if seed.is_some() {
                config.dataset.seed = seed;
            }

            handle_generate(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { config_cmd } => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
            match config_cmd {
                ConfigCommands::Validate { config_file } => handle_config_validate(&config_file)?,
                ConfigCommands::Generate { output, force } => {
                    handle_config_generate(output.as_deref(), force)?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration from file or environment
fn load_config(config_path: Option<&PathBuf>) -> Result<HarnessConfig> {
    let loader = ConfigLoader::new();
    match config_path {
        Some(path) => loader
            .from_file(path)
            .context(format!("Failed to load configuration from {:?}", path)),
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

fn apply_log_level(config: &mut HarnessConfig, log_level: Option<&str>) -> Result<()> {
    if let Some(level) = log_level {
        config.logging.level = LogLevel::from_str(level).map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

/// Command-line flags win over file and environment values
fn apply_run_overrides(config: &mut HarnessConfig, args: &RunArgs) {
    if let Some(host) = &args.host {
        config.target.host = host.clone();
    }
    if let Some(port) = args.port {
        config.target.port = port;
    }
    if let Some(population) = args.population {
        config.worker.population = population;
    }
    if let Some(records) = args.records {
        config.dataset.record_count = records;
    }
    if let Some(max_depth) = args.max_depth {
        config.dataset.max_depth = max_depth;
    }
    if args.seed.is_some() {
        config.dataset.seed = args.seed;
    }
    if let Some(deadline_ms) = args.deadline_ms {
        config.worker.deadline = Duration::from_millis(deadline_ms);
    }
    if args.heartbeat {
        config.verification.enable_heartbeat = true;
    }
}

fn build_connector(config: &HarnessConfig, loopback: bool) -> Arc<dyn Connector> {
    if loopback {
        Arc::new(LoopbackHub::new(config.verification.compressed_payloads))
    } else {
        Arc::new(WebSocketConnector::from_config(&config.target))
    }
}

/// Returns whether the run met the pass-rate threshold
async fn handle_run(config: HarnessConfig, args: &RunArgs) -> Result<bool> {
    let dataset = Orchestrator::prepare_dataset(&config.dataset)
        .context("Failed to generate ground truth")?;
    let connector = build_connector(&config, args.loopback);
    let orchestrator = Orchestrator::from_config(&config, connector)
        .context("Failed to set up orchestrator")?;

    let summary = orchestrator.run(dataset).await.context("Run aborted")?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", json);
    } else {
        println!("{}", summary);
    }

    let threshold = config.verification.min_pass_rate;
    if summary.meets(threshold) {
        info!(pass_rate = summary.pass_rate, threshold, "Run passed");
        Ok(true)
    } else {
        warn!(pass_rate = summary.pass_rate, threshold, "Run below pass-rate threshold");
        Ok(false)
    }
}

/// Print the ground truth as one JSON record per line
fn handle_generate(config: &HarnessConfig) -> Result<()> {
    let dataset =
        Orchestrator::prepare_dataset(&config.dataset).context("Failed to generate ground truth")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in dataset.iter() {
        let line = serde_json::to_string(record).context("Failed to serialize record")?;
        writeln!(out, "{}", line).context("Failed to write record")?;
    }
    out.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Handle configuration validation
fn handle_config_validate(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    match ConfigLoader::new().from_file(config_file) {
        Ok(_config) => {
            println!("✅ Configuration file is valid");
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {}", e);
            Err(e).context(format!("Invalid configuration in {:?}", config_file))
        }
    }
}

/// Handle configuration generation
fn handle_config_generate(output: Option<&Path>, force: bool) -> Result<()> {
    let sample = HarnessConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", sample);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(output, sample).context("Failed to write configuration file")?;

    println!("✅ Configuration generated at: {:?}", output);
    println!("🔧 Validate with: treeload config validate --config-file {:?}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_win() {
        let mut config = HarnessConfig::default();
        let args = RunArgs {
            host: Some("sync.internal".to_string()),
            port: Some(9001),
            population: Some(3),
            records: Some(7),
            max_depth: Some(4),
            seed: Some(11),
            deadline_ms: Some(2500),
            heartbeat: true,
            ..Default::default()
        };
        apply_run_overrides(&mut config, &args);

        assert_eq!(config.target.host, "sync.internal");
        assert_eq!(config.target.port, 9001);
        assert_eq!(config.worker.population, 3);
        assert_eq!(config.dataset.record_count, 7);
        assert_eq!(config.dataset.max_depth, 4);
        assert_eq!(config.dataset.seed, Some(11));
        assert_eq!(config.worker.deadline, Duration::from_millis(2500));
        assert!(config.verification.enable_heartbeat);
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = HarnessConfig::default();
        config.verification.enable_heartbeat = true;
        let before = config.clone();
        apply_run_overrides(&mut config, &RunArgs::default());
        assert_eq!(config.target.host, before.target.host);
        assert_eq!(config.worker.population, before.worker.population);
        assert!(config.verification.enable_heartbeat);
    }

    #[test]
    fn test_override_can_invalidate() {
        let mut config = HarnessConfig::default();
        let args = RunArgs {
            records: Some(-1),
            ..Default::default()
        };
        apply_run_overrides(&mut config, &args);
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_log_level_flag() {
        let mut config = HarnessConfig::default();
        apply_log_level(&mut config, Some("trace")).unwrap();
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert!(apply_log_level(&mut config, Some("loud")).is_err());
    }

    #[test]
    fn test_config_generate_respects_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("treeload.yaml");

        handle_config_generate(Some(&path), false).unwrap();
        assert!(handle_config_generate(Some(&path), false).is_err());
        handle_config_generate(Some(&path), true).unwrap();
        handle_config_validate(&path).unwrap();
    }

    #[tokio::test]
    async fn test_loopback_run_passes() {
        let mut config = HarnessConfig::default();
        config.worker.population = 3;
        config.worker.send_delay_min = Duration::from_millis(10);
        config.worker.send_delay_max = Duration::from_millis(20);
        config.worker.deadline = Duration::from_millis(400);
        config.dataset.record_count = 6;
        config.dataset.max_depth = 4;
        config.dataset.seed = Some(5);
        let args = RunArgs {
            loopback: true,
            json: true,
            ..Default::default()
        };

        assert!(handle_run(config, &args).await.unwrap());
    }

    #[tokio::test]
    async fn test_refused_target_misses_threshold() {
        let mut config = HarnessConfig::default();
        config.target.port = 1;
        config.worker.population = 2;
        config.worker.deadline = Duration::from_millis(300);
        config.dataset.record_count = 3;
        config.dataset.max_depth = 3;

        assert!(!handle_run(config, &RunArgs::default()).await.unwrap());
    }
}
