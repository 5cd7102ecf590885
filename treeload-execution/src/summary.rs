//! Aggregated outcome of a run

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::worker::WorkerReport;

/// Check charged once per worker whose task ended without a report
pub const WORKER_REPORTED_CHECK: &str = "worker reported";

/// Pass/fail tally for one named check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub passes: u64,
    pub fails: u64,
}

impl CheckTally {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

/// Totals over every worker of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub workers_total: u32,
    /// Workers that reached CLOSED
    pub workers_completed: u32,
    /// Workers that ended in FAILED, or whose task did not return
    pub workers_failed: u32,
    pub dataset_size: usize,
    pub checks_total: u64,
    pub checks_passed: u64,
    pub pass_rate: f64,
    pub checks: BTreeMap<String, CheckTally>,
    #[serde(with = "treeload_config::serde_duration_ms")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_reports(
        reports: &[WorkerReport],
        workers_total: u32,
        dataset_size: usize,
        elapsed: Duration,
    ) -> Self {
        let mut checks: BTreeMap<String, CheckTally> = BTreeMap::new();
        for check in reports.iter().flat_map(|report| &report.checks) {
            let tally = checks.entry(check.name.clone()).or_default();
            if check.passed {
                tally.passes += 1;
            } else {
                tally.fails += 1;
            }
        }

        let lost = (workers_total as usize).saturating_sub(reports.len()) as u64;
        if lost > 0 {
            checks.entry(WORKER_REPORTED_CHECK.to_string()).or_default().fails += lost;
        }

        let checks_total: u64 = checks.values().map(CheckTally::total).sum();
        let checks_passed: u64 = checks.values().map(|tally| tally.passes).sum();
        let workers_completed = reports.iter().filter(|report| !report.failed()).count() as u32;

        Self {
            workers_total,
            workers_completed,
            workers_failed: workers_total.saturating_sub(workers_completed),
            dataset_size,
            checks_total,
            checks_passed,
            pass_rate: if checks_total == 0 {
                0.0
            } else {
                checks_passed as f64 / checks_total as f64
            },
            checks,
            elapsed,
        }
    }

    /// Whether the aggregate pass rate reaches `min_pass_rate`
    pub fn meets(&self, min_pass_rate: f64) -> bool {
        self.checks_total > 0 && self.pass_rate >= min_pass_rate
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run summary")?;
        writeln!(
            f,
            "  workers ........ {} total, {} completed, {} failed",
            self.workers_total, self.workers_completed, self.workers_failed
        )?;
        writeln!(f, "  ground truth ... {} records", self.dataset_size)?;
        writeln!(
            f,
            "  checks ......... {:.2}% {} / {}",
            self.pass_rate * 100.0,
            self.checks_passed,
            self.checks_total
        )?;
        for (name, tally) in &self.checks {
            let mark = if tally.fails == 0 { '✓' } else { '✗' };
            writeln!(
                f,
                "    {} {:<32} {} passed, {} failed",
                mark, name, tally.passes, tally.fails
            )?;
        }
        write!(f, "  elapsed ........ {:.3}s", self.elapsed.as_secs_f64())
    }
}
