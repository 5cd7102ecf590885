//! CLI argument parsing definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a worker population against the sync service
    Run(RunArgs),

    /// Print a generated ground truth as JSON lines
    Generate {
        /// Number of records
        #[arg(long, value_name = "N")]
        records: Option<i64>,

        /// Maximum path depth
        #[arg(long, value_name = "D")]
        max_depth: Option<i64>,

        /// Fixed seed for reproducible output
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

/// Overrides applied on top of file and environment configuration
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Service host
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Service port
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    pub population: Option<u32>,

    /// Ground-truth record count
    #[arg(long, value_name = "N")]
    pub records: Option<i64>,

    /// Maximum path depth
    #[arg(long, value_name = "D")]
    pub max_depth: Option<i64>,

    /// Fixed seed for dataset and send delays
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Per-worker lifetime in milliseconds
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Send PING after the last batch
    #[arg(long)]
    pub heartbeat: bool,

    /// Run against an in-process hub instead of the network
    #[arg(long)]
    pub loopback: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Write the default configuration as YAML
    Generate {
        /// Output file; stdout when omitted
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "treeload",
            "--log-level",
            "debug",
            "run",
            "--host",
            "sync.internal",
            "--port",
            "9000",
            "--population",
            "20",
            "--records",
            "5",
            "--deadline-ms",
            "4000",
            "--heartbeat",
            "--loopback",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.host.as_deref(), Some("sync.internal"));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.population, Some(20));
        assert_eq!(args.records, Some(5));
        assert_eq!(args.deadline_ms, Some(4000));
        assert!(args.heartbeat);
        assert!(args.loopback);
        assert!(!args.json);
        assert_eq!(args.seed, None);
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["treeload", "run", "--config", "harness.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("harness.yaml")));
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::try_parse_from([
            "treeload", "generate", "--records", "12", "--max-depth", "4", "--seed", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate { records, max_depth, seed } => {
                assert_eq!(records, Some(12));
                assert_eq!(max_depth, Some(4));
                assert_eq!(seed, Some(7));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::try_parse_from(["treeload", "config", "validate", "--config-file", "a.yaml"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { config_cmd: ConfigCommands::Validate { .. } }
        ));

        let cli = Cli::try_parse_from(["treeload", "config", "generate", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { config_cmd: ConfigCommands::Generate { output: None, force: true } }
        ));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["treeload", "run", "--port", "70000"]).is_err());
        assert!(Cli::try_parse_from(["treeload"]).is_err());
    }
}
