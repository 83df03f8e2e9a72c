//! Run orchestration: wires config, provider, pool, store and monitor.
//!
//! Two entry points, one per [`RunMode`]:
//! - `run_single()`: one symbol in-process. Used by `randomwalk simulate`.
//! - `run_batch()`: a whole universe through the worker pool, then the
//!   completion barrier. Used by `randomwalk batch`.
//!
//! Only configuration problems abort a run. Per-symbol failures become
//! failure artifacts and show up in the returned report.

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use randomwalk_core::data::{DataError, PriceProvider, SymbolUniverse, UniverseError};
use randomwalk_core::domain::run_namespace;
use randomwalk_core::rng::job_rng;
use randomwalk_core::RngHierarchy;

use crate::artifact::{encode_paths, ArtifactKey};
use crate::config::{BatchRun, ConfigError, RunConfig, RunMode, SingleSymbolRun};
use crate::monitor::{CompletionMonitor, CompletionReport, MonitorError};
use crate::pool::{
    calendar_reference, JobOutcome, JobResult, PoolError, PoolSummary, SimulationJob, WorkerPool,
};
use crate::store::{ArtifactStore, StoreError};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("symbol universe: {0}")]
    Universe(#[from] UniverseError),
    #[error("{0}")]
    Pool(#[from] PoolError),
    #[error("completion monitor: {0}")]
    Monitor(#[from] MonitorError),
    #[error("artifact store: {0}")]
    Store(#[from] StoreError),
    #[error("encode paths: {0}")]
    Encode(#[from] csv::Error),
    #[error("write output: {0}")]
    Output(#[from] std::io::Error),
    #[error("calendar reference {symbol}: {source}")]
    Reference {
        symbol: String,
        #[source]
        source: DataError,
    },
    #[error("write artifact {key}: {message}")]
    ArtifactWrite { key: String, message: String },
    #[error("expected a {expected} run configuration")]
    WrongMode { expected: &'static str },
}

/// Result of a single-symbol run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRunReport {
    pub symbol: String,
    pub outcome: JobOutcome,
    /// Paths simulated; zero on failure.
    pub paths: usize,
    /// Where the artifact went. `None` when rows were streamed to the writer.
    pub artifact: Option<ArtifactKey>,
}

/// Result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub namespace: String,
    pub universe_size: usize,
    /// Artifacts found in the namespace before dispatch.
    pub preexisting: usize,
    pub summary: PoolSummary,
    /// `None` when the run skipped the completion monitor.
    pub completion: Option<CompletionReport>,
}

/// Resolve the batch universe from the file (if any) or the inline list.
pub fn load_universe(batch: &BatchRun) -> Result<SymbolUniverse, UniverseError> {
    match &batch.symbols_file {
        Some(path) => SymbolUniverse::from_file(path, batch.symbols_column.as_deref()),
        None => Ok(SymbolUniverse::new(batch.symbols.clone())),
    }
}

/// Simulate one symbol.
///
/// With `to_stdout` the success rows go to `out` and nothing is stored;
/// otherwise the job writes its artifact to `store` like a pool job would.
pub fn run_single(
    config: &RunConfig,
    provider: &dyn PriceProvider,
    store: &dyn ArtifactStore,
    out: &mut dyn Write,
) -> Result<SingleRunReport, RunError> {
    config.validate()?;
    let RunMode::Single(single) = &config.mode else {
        return Err(RunError::WrongMode { expected: "single" });
    };
    let SingleSymbolRun {
        symbol,
        start_date,
        end_date,
        to_stdout,
    } = single;

    let pool = WorkerPool::from_settings(&config.pool, &config.simulation).with_seed(config.seed);
    let job = SimulationJob::new(symbol.clone(), *start_date, *end_date);
    let run_id = config.run_id();

    if !*to_stdout {
        let report = pool.run_job(&job, provider, store, &run_id);
        if let Some(message) = report.write_error {
            return Err(RunError::ArtifactWrite {
                key: report.artifact.to_string(),
                message,
            });
        }
        let paths = match report.outcome {
            JobOutcome::Success(_) => pool.simulator().iterations(),
            _ => 0,
        };
        return Ok(SingleRunReport {
            symbol: symbol.clone(),
            outcome: report.outcome,
            paths,
            artifact: Some(report.artifact),
        });
    }

    let hierarchy = config.seed.map(RngHierarchy::new);
    let mut rng = job_rng(hierarchy.as_ref(), &run_id, symbol);
    let (outcome, paths) = match pool.execute(&job, provider, &mut rng) {
        JobResult::Paths(paths) => {
            out.write_all(&encode_paths(&paths)?)?;
            out.flush()?;
            let key = ArtifactKey::success(*start_date, *end_date, symbol);
            (JobOutcome::Success(key), paths.len())
        }
        JobResult::Failure { reason, detail } => {
            warn!(symbol = %symbol, reason = %reason, %detail, "simulation failed");
            (JobOutcome::from_failure(reason, detail), 0)
        }
    };

    Ok(SingleRunReport {
        symbol: symbol.clone(),
        outcome,
        paths,
        artifact: None,
    })
}

/// Dispatch a universe through the pool, then wait for its artifacts.
pub fn run_batch(
    config: &RunConfig,
    provider: &dyn PriceProvider,
    store: &dyn ArtifactStore,
) -> Result<BatchReport, RunError> {
    config.validate()?;
    let RunMode::Batch(batch) = &config.mode else {
        return Err(RunError::WrongMode { expected: "batch" });
    };

    let universe = load_universe(batch)?;
    let namespace = run_namespace(batch.start_date, batch.end_date);
    info!(
        namespace = %namespace,
        symbols = universe.len(),
        provider = provider.name(),
        "batch run"
    );

    let reference_count = match &config.pool.reference_symbol {
        Some(symbol) => Some(
            calendar_reference(provider, symbol, batch.start_date, batch.end_date).map_err(
                |source| RunError::Reference {
                    symbol: symbol.clone(),
                    source,
                },
            )?,
        ),
        None => None,
    };

    let monitor = CompletionMonitor::new(store, namespace.clone(), universe.len())
        .with_settings(&config.monitor);
    let preexisting = monitor.preexisting_artifacts()?;
    if preexisting > 0 {
        warn!(
            namespace = %namespace,
            preexisting,
            "namespace is not empty; completion may be reported early"
        );
    }

    let pool = WorkerPool::from_settings(&config.pool, &config.simulation)
        .with_seed(config.seed)
        .with_reference_count(reference_count);
    let jobs = SimulationJob::for_symbols(universe.symbols(), batch.start_date, batch.end_date);
    let summary = pool.run(&jobs, provider, store, &config.run_id())?;

    let completion = if batch.no_wait {
        None
    } else {
        Some(monitor.wait()?)
    };

    Ok(BatchReport {
        namespace,
        universe_size: universe.len(),
        preexisting,
        summary,
        completion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryArtifactStore;
    use chrono::NaiveDate;
    use randomwalk_core::data::SyntheticProvider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn single(symbol: &str, to_stdout: bool) -> RunConfig {
        let mut cfg = RunConfig::new(RunMode::Single(SingleSymbolRun {
            symbol: symbol.into(),
            start_date: d(2017, 1, 1),
            end_date: d(2019, 1, 1),
            to_stdout,
        }));
        cfg.simulation.iterations = 4;
        cfg.seed = Some(1);
        cfg
    }

    #[test]
    fn single_run_writes_artifact() {
        let store = InMemoryArtifactStore::new();
        let mut out = Vec::new();
        let report = run_single(&single("AAPL", false), &SyntheticProvider::new(), &store, &mut out)
            .unwrap();
        assert!(report.outcome.is_success());
        assert_eq!(report.paths, 4);
        assert!(out.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn single_run_streams_rows() {
        let store = InMemoryArtifactStore::new();
        let mut out = Vec::new();
        let report = run_single(&single("AAPL", true), &SyntheticProvider::new(), &store, &mut out)
            .unwrap();
        assert!(report.artifact.is_none());
        assert!(store.is_empty());
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|l| l.starts_with("AAPL,")));
    }

    #[test]
    fn single_run_reports_failure() {
        let store = InMemoryArtifactStore::new();
        let provider = SyntheticProvider::new().with_unknown(["ZZZZ"]);
        let report = run_single(&single("ZZZZ", false), &provider, &store, &mut Vec::new()).unwrap();
        assert!(matches!(report.outcome, JobOutcome::DataUnavailable(_)));
        assert_eq!(report.artifact.unwrap().name, "ZZZZ_empty");
    }

    #[test]
    fn wrong_mode_is_rejected() {
        let cfg = single("AAPL", false);
        let err = run_batch(&cfg, &SyntheticProvider::new(), &InMemoryArtifactStore::new());
        assert!(matches!(err, Err(RunError::WrongMode { expected: "batch" })));
    }

    #[test]
    fn missing_reference_symbol_aborts_batch() {
        let mut cfg = RunConfig::new(RunMode::Batch(BatchRun {
            start_date: d(2017, 1, 1),
            end_date: d(2019, 1, 1),
            symbols: vec!["AAPL".into()],
            symbols_file: None,
            symbols_column: None,
            no_wait: true,
        }));
        cfg.pool.reference_symbol = Some("QQQ".into());
        let provider = SyntheticProvider::new().with_unknown(["QQQ"]);
        let err = run_batch(&cfg, &provider, &InMemoryArtifactStore::new());
        assert!(matches!(err, Err(RunError::Reference { .. })));
    }
}
