//! Random-walk runner: configuration, artifacts, worker pool, completion barrier.
//!
//! This crate builds on `randomwalk-core` to provide:
//! - TOML run configuration with batch and single-symbol modes
//! - Artifact naming and CSV encoding (success rows, failure-reason lines)
//! - Artifact stores (filesystem, in-memory) behind one trait
//! - Worker pool executing one job per symbol on a private Rayon pool
//! - Polling completion monitor with capped exponential backoff
//! - Single-symbol and batch run orchestration

pub mod artifact;
pub mod config;
pub mod monitor;
pub mod pool;
pub mod run;
pub mod store;

pub use artifact::{ArtifactKey, FailureReason};
pub use config::{
    BatchRun, ConfigError, MonitorSettings, PoolSettings, RunConfig, RunMode, SimulationSettings,
    SingleSymbolRun,
};
pub use monitor::{CompletionBarrier, CompletionMonitor, CompletionReport, MonitorError, PollSchedule};
pub use pool::{JobOutcome, JobReport, JobResult, PoolError, PoolSummary, SimulationJob, WorkerPool};
pub use run::{load_universe, run_batch, run_single, BatchReport, RunError, SingleRunReport};
pub use store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore, StoreError};
