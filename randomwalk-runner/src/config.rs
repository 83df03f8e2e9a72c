//! Serializable run configuration.
//!
//! A run is either a single-symbol simulation or a batch over a symbol
//! universe. Both share the simulation settings; a batch adds the pool and
//! completion-monitor settings.
//!
//! ```toml
//! output_dir = "output"
//! seed = 42
//!
//! [mode]
//! kind = "batch"
//! start_date = "2017-01-01"
//! end_date = "2019-01-01"
//! symbols = ["AAPL", "MSFT"]
//!
//! [pool]
//! workers = 8
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use randomwalk_core::domain::is_file_safe_symbol;
use randomwalk_core::{RunId, DEFAULT_ITERATIONS, TRADING_DAYS};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TOLERANCE_DAYS: i64 = 3;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("start date {start} must be before end date {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("{field} must be at least 1")]
    ZeroSetting { field: &'static str },

    #[error("batch run has an empty symbol universe")]
    EmptyUniverse,

    #[error("single-symbol run has an empty symbol")]
    EmptySymbol,

    #[error("symbol '{0}' cannot name an artifact file")]
    InvalidSymbol(String),

    #[error("poll interval {initial_ms}ms exceeds cap {max_ms}ms")]
    InvalidPollSchedule { initial_ms: u64, max_ms: u64 },
}

/// Which kind of run to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunMode {
    /// Dispatch every symbol of a universe through the worker pool, then wait
    /// for the artifact count to reach the universe size.
    Batch(BatchRun),

    /// Simulate one symbol in-process.
    Single(SingleSymbolRun),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inline symbols. Used when `symbols_file` is absent.
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub symbols_file: Option<PathBuf>,
    /// Column to read when `symbols_file` is a headered listing.
    #[serde(default)]
    pub symbols_column: Option<String>,
    /// Skip the completion monitor after the pool drains.
    #[serde(default)]
    pub no_wait: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleSymbolRun {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Write the success rows to stdout instead of the artifact store.
    #[serde(default)]
    pub to_stdout: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub iterations: usize,
    pub trading_days: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            trading_days: TRADING_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub workers: usize,
    /// Max allowed gap, in days, between the requested start and the first
    /// returned observation.
    pub tolerance_days: i64,
    /// Symbol whose observation count every series must match.
    pub reference_symbol: Option<String>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            tolerance_days: DEFAULT_TOLERANCE_DAYS,
            reference_symbol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub initial_poll_ms: u64,
    pub max_poll_ms: u64,
    pub backoff_factor: u32,
    /// Give up after this many seconds. `None` waits indefinitely.
    pub max_wait_secs: Option<u64>,
    pub max_query_failures: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            initial_poll_ms: 1_000,
            max_poll_ms: 5_000,
            backoff_factor: 2,
            max_wait_secs: None,
            max_query_failures: 10,
        }
    }
}

impl MonitorSettings {
    pub fn initial_poll(&self) -> Duration {
        Duration::from_millis(self.initial_poll_ms)
    }

    pub fn max_poll(&self) -> Duration {
        Duration::from_millis(self.max_poll_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    /// Reject schedules that would busy-poll the store or never back off.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_poll_ms == 0 {
            return Err(ConfigError::ZeroSetting { field: "initial_poll_ms" });
        }
        if self.backoff_factor == 0 {
            return Err(ConfigError::ZeroSetting { field: "backoff_factor" });
        }
        if self.max_query_failures == 0 {
            return Err(ConfigError::ZeroSetting { field: "max_query_failures" });
        }
        if self.initial_poll_ms > self.max_poll_ms {
            return Err(ConfigError::InvalidPollSchedule {
                initial_ms: self.initial_poll_ms,
                max_ms: self.max_poll_ms,
            });
        }
        Ok(())
    }
}

/// Complete configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: RunMode,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Master seed. Absent means every job draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl RunConfig {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            simulation: SimulationSettings::default(),
            pool: PoolSettings::default(),
            monitor: MonitorSettings::default(),
            output_dir: default_output_dir(),
            seed: None,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        match &self.mode {
            RunMode::Batch(b) => (b.start_date, b.end_date),
            RunMode::Single(s) => (s.start_date, s.end_date),
        }
    }

    pub fn run_id(&self) -> RunId {
        let (start, end) = self.window();
        RunId::for_window(start, end)
    }

    /// Check everything that would make a run fail before its first job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (start, end) = self.window();
        if start >= end {
            return Err(ConfigError::InvalidWindow { start, end });
        }

        match &self.mode {
            RunMode::Batch(b) => {
                if b.symbols_file.is_none() && b.symbols.is_empty() {
                    return Err(ConfigError::EmptyUniverse);
                }
            }
            RunMode::Single(s) => {
                if s.symbol.trim().is_empty() {
                    return Err(ConfigError::EmptySymbol);
                }
                if !is_file_safe_symbol(&s.symbol) {
                    return Err(ConfigError::InvalidSymbol(s.symbol.clone()));
                }
            }
        }

        if self.simulation.iterations == 0 {
            return Err(ConfigError::ZeroSetting { field: "iterations" });
        }
        if self.simulation.trading_days == 0 {
            return Err(ConfigError::ZeroSetting { field: "trading_days" });
        }
        if self.pool.workers == 0 {
            return Err(ConfigError::ZeroSetting { field: "workers" });
        }
        self.monitor.validate()
    }
}
