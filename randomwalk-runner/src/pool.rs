//! Worker pool: one simulation job per symbol, one artifact per job.
//!
//! Per-job contract:
//! 1. Fetch the history. Any provider error, or an empty history, is
//!    `DataUnavailable` and writes a `no_historical_data` artifact.
//! 2. A first observation more than `tolerance_days` away from the requested
//!    start, or an observation count that differs from the calendar
//!    reference, is `DateRangeMismatch` and writes `time_interval_mismatch`.
//! 3. Otherwise estimate, simulate and write the paths.
//!
//! Jobs share no mutable state and write distinct keys. The pool runs on a
//! private Rayon thread pool sized to `workers`; the `install` join is the
//! only synchronization.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use randomwalk_core::data::{DataError, PriceProvider};
use randomwalk_core::rng::job_rng;
use randomwalk_core::{
    HistoricalSeries, HistoricalStatsEstimator, PathSimulator, RngHierarchy, RunId, SimulatedPath,
};

use crate::artifact::{encode_failure, encode_paths, ArtifactKey, FailureReason};
use crate::config::{PoolSettings, SimulationSettings, DEFAULT_TOLERANCE_DAYS, DEFAULT_WORKERS};
use crate::store::ArtifactStore;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One unit of work: simulate `symbol` from history over `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationJob {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SimulationJob {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
        }
    }

    /// One job per symbol, all over the same window.
    pub fn for_symbols(symbols: &[String], start: NaiveDate, end: NaiveDate) -> Vec<Self> {
        symbols
            .iter()
            .map(|s| Self::new(s.clone(), start, end))
            .collect()
    }
}

/// Terminal result of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Success(ArtifactKey),
    DataUnavailable(String),
    DateRangeMismatch(String),
}

impl JobOutcome {
    pub fn from_failure(reason: FailureReason, detail: String) -> Self {
        match reason {
            FailureReason::NoHistoricalData => JobOutcome::DataUnavailable(detail),
            FailureReason::TimeIntervalMismatch => JobOutcome::DateRangeMismatch(detail),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            JobOutcome::Success(_) => None,
            JobOutcome::DataUnavailable(_) => Some(FailureReason::NoHistoricalData),
            JobOutcome::DateRangeMismatch(_) => Some(FailureReason::TimeIntervalMismatch),
        }
    }
}

/// What a job computed, before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    Paths(Vec<SimulatedPath>),
    Failure { reason: FailureReason, detail: String },
}

impl JobResult {
    fn failure(reason: FailureReason, detail: impl Into<String>) -> Self {
        JobResult::Failure {
            reason,
            detail: detail.into(),
        }
    }
}

/// Outcome of one job plus the artifact it wrote (or failed to write).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job: SimulationJob,
    pub outcome: JobOutcome,
    pub artifact: ArtifactKey,
    /// Set when the artifact could not be written.
    pub write_error: Option<String>,
}

impl JobReport {
    pub fn artifact_written(&self) -> bool {
        self.write_error.is_none()
    }
}

/// Everything a pool run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolSummary {
    /// One report per job, in dispatch order.
    pub reports: Vec<JobReport>,
    pub succeeded: usize,
    pub data_unavailable: usize,
    pub date_range_mismatch: usize,
    pub write_failures: usize,
    pub elapsed: Duration,
}

impl PoolSummary {
    fn from_reports(reports: Vec<JobReport>, elapsed: Duration) -> Self {
        let mut summary = PoolSummary {
            elapsed,
            ..Default::default()
        };
        for r in &reports {
            match r.outcome {
                JobOutcome::Success(_) => summary.succeeded += 1,
                JobOutcome::DataUnavailable(_) => summary.data_unavailable += 1,
                JobOutcome::DateRangeMismatch(_) => summary.date_range_mismatch += 1,
            }
            if !r.artifact_written() {
                summary.write_failures += 1;
            }
        }
        summary.reports = reports;
        summary
    }

    pub fn jobs(&self) -> usize {
        self.reports.len()
    }

    pub fn artifacts_written(&self) -> usize {
        self.jobs() - self.write_failures
    }
}

/// Fixed-size parallel executor of simulation jobs.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    tolerance_days: i64,
    estimator: HistoricalStatsEstimator,
    simulator: PathSimulator,
    rng: Option<RngHierarchy>,
    reference_count: Option<usize>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            tolerance_days: DEFAULT_TOLERANCE_DAYS,
            estimator: HistoricalStatsEstimator::default(),
            simulator: PathSimulator::default(),
            rng: None,
            reference_count: None,
        }
    }

    /// Pool configured from run settings.
    pub fn from_settings(pool: &PoolSettings, simulation: &SimulationSettings) -> Self {
        Self::new(pool.workers)
            .with_tolerance_days(pool.tolerance_days)
            .with_simulator(
                PathSimulator::new(simulation.iterations)
                    .with_trading_days(simulation.trading_days),
            )
    }

    pub fn with_tolerance_days(mut self, days: i64) -> Self {
        self.tolerance_days = days;
        self
    }

    pub fn with_simulator(mut self, simulator: PathSimulator) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.rng = seed.map(RngHierarchy::new);
        self
    }

    /// Require every series to have exactly `count` observations.
    pub fn with_reference_count(mut self, count: Option<usize>) -> Self {
        self.reference_count = count;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn simulator(&self) -> &PathSimulator {
        &self.simulator
    }

    /// Run every job to completion and return one report per job.
    pub fn run(
        &self,
        jobs: &[SimulationJob],
        provider: &dyn PriceProvider,
        store: &dyn ArtifactStore,
        run_id: &RunId,
    ) -> Result<PoolSummary, PoolError> {
        let started = Instant::now();
        info!(jobs = jobs.len(), workers = self.workers, run = %run_id, "dispatching jobs");

        let tp = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        let reports: Vec<JobReport> = tp.install(|| {
            jobs.par_iter()
                .map(|job| self.run_job(job, provider, store, run_id))
                .collect()
        });

        let summary = PoolSummary::from_reports(reports, started.elapsed());
        info!(
            succeeded = summary.succeeded,
            data_unavailable = summary.data_unavailable,
            date_range_mismatch = summary.date_range_mismatch,
            write_failures = summary.write_failures,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "pool drained"
        );
        Ok(summary)
    }

    /// Execute one job and write its artifact.
    pub fn run_job(
        &self,
        job: &SimulationJob,
        provider: &dyn PriceProvider,
        store: &dyn ArtifactStore,
        run_id: &RunId,
    ) -> JobReport {
        let mut rng = job_rng(self.rng.as_ref(), run_id, &job.symbol);
        let result = self.execute(job, provider, &mut rng);

        let (outcome, artifact, bytes) = match result {
            JobResult::Paths(paths) => {
                let key = ArtifactKey::success(job.start, job.end, &job.symbol);
                let bytes = encode_paths(&paths).map_err(|e| e.to_string());
                (JobOutcome::Success(key.clone()), key, bytes)
            }
            JobResult::Failure { reason, detail } => {
                let key = ArtifactKey::failure(job.start, job.end, &job.symbol, reason);
                let bytes = Ok(encode_failure(reason, &detail));
                (JobOutcome::from_failure(reason, detail), key, bytes)
            }
        };

        let write_error = match bytes {
            Ok(bytes) => store.put(&artifact, &bytes).err().map(|e| e.to_string()),
            Err(e) => Some(e),
        };
        if let Some(err) = &write_error {
            warn!(symbol = %job.symbol, artifact = %artifact, error = %err, "artifact write failed");
        }

        JobReport {
            job: job.clone(),
            outcome,
            artifact,
            write_error,
        }
    }

    /// Fetch, validate, estimate and simulate. Writes nothing.
    pub fn execute<R: Rng>(
        &self,
        job: &SimulationJob,
        provider: &dyn PriceProvider,
        rng: &mut R,
    ) -> JobResult {
        let series = match provider.fetch(&job.symbol, job.start, job.end) {
            Ok(series) if !series.is_empty() => series,
            Ok(_) => {
                warn!(symbol = %job.symbol, "provider returned no observations");
                return JobResult::failure(FailureReason::NoHistoricalData, "empty history");
            }
            Err(e) => {
                warn!(symbol = %job.symbol, error = %e, "fetch failed");
                return JobResult::failure(FailureReason::NoHistoricalData, e.to_string());
            }
        };

        if let Some(detail) = self.window_mismatch(job, &series) {
            warn!(symbol = %job.symbol, %detail, "history does not match requested window");
            return JobResult::failure(FailureReason::TimeIntervalMismatch, detail);
        }

        let params = match self.estimator.estimate(&series) {
            Ok(p) => p,
            Err(e) => {
                warn!(symbol = %job.symbol, error = %e, "estimation failed");
                return JobResult::failure(FailureReason::NoHistoricalData, e.to_string());
            }
        };

        let Some(starting_price) = series.last_close() else {
            return JobResult::failure(FailureReason::NoHistoricalData, "empty history");
        };

        debug!(
            symbol = %job.symbol,
            cagr = params.cagr(),
            volatility = params.volatility(),
            starting_price,
            "simulating"
        );
        JobResult::Paths(self.simulator.simulate(&job.symbol, &params, starting_price, rng))
    }

    fn window_mismatch(&self, job: &SimulationJob, series: &HistoricalSeries) -> Option<String> {
        let first = series.first_date()?;
        let gap = (first - job.start).num_days().abs();
        if gap > self.tolerance_days {
            return Some(format!(
                "first observation {first} is {gap} days from requested start {} (tolerance {})",
                job.start, self.tolerance_days
            ));
        }

        match self.reference_count {
            Some(expected) if series.len() != expected => Some(format!(
                "{} observations, calendar reference has {expected}",
                series.len()
            )),
            _ => None,
        }
    }
}

/// Observation count of the calendar reference symbol over the window.
pub fn calendar_reference(
    provider: &dyn PriceProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, DataError> {
    let series = provider.fetch(symbol, start, end)?;
    info!(symbol, observations = series.len(), "calendar reference loaded");
    Ok(series.len())
}
