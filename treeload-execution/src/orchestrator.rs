//! Spawns the worker population and aggregates their checks

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info};
use treeload_config::{DatasetConfig, HarnessConfig};
use treeload_core::{generate, Dataset, WorkerId};

use crate::error::ExecutionError;
use crate::settings::WorkerSettings;
use crate::summary::RunSummary;
use crate::transport::Connector;
use crate::worker::{ConnectionWorker, WorkerReport};

/// Runs `population` independent workers once each
pub struct Orchestrator {
    population: u32,
    settings: Arc<WorkerSettings>,
    connector: Arc<dyn Connector>,
    seed: Option<u64>,
}

impl Orchestrator {
    pub fn new(population: u32, settings: WorkerSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            population,
            settings: Arc::new(settings),
            connector,
            seed: None,
        }
    }

    /// Build from a validated configuration
    pub fn from_config(
        config: &HarnessConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ExecutionError> {
        config.validate_all()?;
        let mut orchestrator = Self::new(
            config.worker.population,
            WorkerSettings::from_config(config),
            connector,
        );
        orchestrator.seed = config.dataset.seed;
        Ok(orchestrator)
    }

    /// Fix the seed used to draw send delays
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn population(&self) -> u32 {
        self.population
    }

    /// Generate the ground truth for a run; fails before anything is spawned
    pub fn prepare_dataset(config: &DatasetConfig) -> Result<Dataset, ExecutionError> {
        let mut rng = seeded_rng(config.seed);
        let dataset = generate(config.record_count, config.max_depth, &mut rng)?;
        info!(records = dataset.len(), max_depth = config.max_depth, "Ground truth generated");
        Ok(dataset)
    }

    /// Run every worker to completion and summarise.
    ///
    /// Per-worker failures are recorded, never propagated.
    pub async fn run(&self, dataset: Dataset) -> Result<RunSummary, ExecutionError> {
        if self.population == 0 {
            return Err(ExecutionError::Configuration(
                "population must be greater than 0".to_string(),
            ));
        }

        let started = Instant::now();
        let mut rng = seeded_rng(self.seed);
        let mut workers = JoinSet::new();

        info!(
            population = self.population,
            records = dataset.len(),
            target = %self.connector.describe(),
            "Starting workers"
        );

        for id in WorkerId::range(self.population) {
            let send_delay = self.settings.draw_send_delay(&mut rng);
            let worker = ConnectionWorker::new(
                id,
                dataset.clone(),
                Arc::clone(&self.settings),
                Arc::clone(&self.connector),
            );
            workers.spawn(worker.run(send_delay));
        }

        let mut reports: Vec<WorkerReport> = Vec::with_capacity(self.population as usize);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => {
                    let err = ExecutionError::from(e);
                    error!(error = %err, "Worker task did not complete, charging a failed check");
                }
            }
        }
        reports.sort_by_key(|report| report.worker_id);

        let summary = RunSummary::from_reports(
            &reports,
            self.population,
            dataset.len(),
            started.elapsed(),
        );
        info!(
            pass_rate = summary.pass_rate,
            passed = summary.checks_passed,
            total = summary.checks_total,
            failed_workers = summary.workers_failed,
            "Run finished"
        );
        Ok(summary)
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
