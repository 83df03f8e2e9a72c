//! Random-walk CLI: single-symbol simulation, batch runs, partitioning, waiting.
//!
//! Commands:
//! - `simulate`: simulate one symbol; exits 1 when the symbol has no usable history
//! - `batch`: run a symbol universe through the worker pool, then wait for its artifacts
//! - `partition`: split a symbol universe into rows of distributed work
//! - `await`: wait for a namespace to reach an expected artifact count

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use randomwalk_core::data::{
    CircuitBreaker, CsvDirProvider, PriceProvider, SymbolUniverse, SyntheticProvider,
    YahooProvider,
};
use randomwalk_core::domain::run_namespace;
use randomwalk_core::partition::write_partition_file;
use randomwalk_core::SymbolPartitioner;
use randomwalk_runner::{
    run_batch, run_single, BatchRun, CompletionMonitor, CompletionReport, FsArtifactStore,
    JobOutcome, MonitorSettings, RunConfig, RunMode, SingleSymbolRun,
};

#[derive(Parser)]
#[command(
    name = "randomwalk",
    about = "Monte-Carlo random-walk price simulation over a symbol universe"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    /// Yahoo Finance chart API.
    Yahoo,
    /// `{SYMBOL}.csv` files with `date,close` columns under --data-dir.
    Csv,
    /// Deterministic fake prices. For plumbing checks only.
    Synthetic,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Where historical prices come from.
    #[arg(long, value_enum, default_value_t = ProviderKind::Yahoo)]
    provider: ProviderKind,

    /// Directory of per-symbol CSV files (required with --provider csv).
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
struct UniverseArgs {
    /// Comma-separated symbols (e.g., AAPL,MSFT,GOOG).
    #[arg(long, conflicts_with = "symbols_file")]
    symbols: Option<String>,

    /// File of symbols: comma/newline separated, or a headered listing with --symbols-column.
    #[arg(long)]
    symbols_file: Option<PathBuf>,

    /// Column to read from a headered symbol listing (e.g., "NASDAQ Symbol").
    #[arg(long, requires = "symbols_file")]
    symbols_column: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate price paths for one symbol.
    Simulate {
        /// Symbol to simulate.
        #[arg(long)]
        symbol: Option<String>,

        /// Start of the historical window (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// End of the historical window (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Path to a TOML run config. Flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Artifact root directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Master seed for reproducible paths.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of simulated paths.
        #[arg(long)]
        iterations: Option<usize>,

        #[command(flatten)]
        source: SourceArgs,

        /// Write the path rows to stdout instead of the artifact store.
        #[arg(long, default_value_t = false)]
        stdout: bool,
    },
    /// Simulate every symbol of a universe, then wait for all artifacts.
    Batch {
        /// Start of the historical window (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// End of the historical window (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        #[command(flatten)]
        universe: UniverseArgs,

        /// Path to a TOML run config. Flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Parallel workers.
        #[arg(long)]
        workers: Option<usize>,

        /// Max days between the requested start and the first observation.
        #[arg(long)]
        tolerance_days: Option<i64>,

        /// Every series must have as many observations as this symbol (e.g., QQQ).
        #[arg(long)]
        reference_symbol: Option<String>,

        /// Master seed for reproducible paths.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of simulated paths per symbol.
        #[arg(long)]
        iterations: Option<usize>,

        #[command(flatten)]
        source: SourceArgs,

        /// Artifact root directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Exit after dispatch without waiting for the artifacts.
        #[arg(long, default_value_t = false)]
        no_wait: bool,

        /// Stop waiting after this many seconds.
        #[arg(long)]
        max_wait_secs: Option<u64>,
    },
    /// Split a symbol universe into rows for distributed dispatch.
    Partition {
        #[command(flatten)]
        universe: UniverseArgs,

        /// Number of rows (at least 2).
        #[arg(long)]
        rows: usize,

        /// Partition file to write.
        #[arg(long)]
        output: PathBuf,
    },
    /// Wait until a run namespace holds the expected number of artifacts.
    Await {
        /// Start of the historical window (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End of the historical window (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Number of dispatched jobs.
        #[arg(long)]
        expected: usize,

        /// Artifact root directory.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// First poll interval in milliseconds.
        #[arg(long, default_value_t = 1_000)]
        initial_poll_ms: u64,

        /// Poll interval cap in milliseconds.
        #[arg(long, default_value_t = 5_000)]
        max_poll_ms: u64,

        /// Stop waiting after this many seconds.
        #[arg(long)]
        max_wait_secs: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            symbol,
            start,
            end,
            config,
            output_dir,
            seed,
            iterations,
            source,
            stdout,
        } => run_simulate_cmd(
            symbol, start, end, config, output_dir, seed, iterations, source, stdout,
        ),
        Commands::Batch {
            start,
            end,
            universe,
            config,
            workers,
            tolerance_days,
            reference_symbol,
            seed,
            iterations,
            source,
            output_dir,
            no_wait,
            max_wait_secs,
        } => {
            let mut cfg = batch_config(start, end, &universe, config.as_deref())?;
            if let Some(w) = workers {
                cfg.pool.workers = w;
            }
            if let Some(t) = tolerance_days {
                cfg.pool.tolerance_days = t;
            }
            if reference_symbol.is_some() {
                cfg.pool.reference_symbol = reference_symbol;
            }
            if let Some(n) = iterations {
                cfg.simulation.iterations = n;
            }
            if let Some(dir) = output_dir {
                cfg.output_dir = dir;
            }
            if max_wait_secs.is_some() {
                cfg.monitor.max_wait_secs = max_wait_secs;
            }
            cfg.seed = seed.or(cfg.seed);
            if let RunMode::Batch(b) = &mut cfg.mode {
                b.no_wait |= no_wait;
            }
            run_batch_cmd(&cfg, &source)
        }
        Commands::Partition {
            universe,
            rows,
            output,
        } => run_partition(&universe, rows, &output),
        Commands::Await {
            start,
            end,
            expected,
            output_dir,
            initial_poll_ms,
            max_poll_ms,
            max_wait_secs,
        } => {
            let settings = MonitorSettings {
                initial_poll_ms,
                max_poll_ms,
                max_wait_secs,
                ..MonitorSettings::default()
            };
            run_await(&start, &end, expected, &output_dir, &settings)
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn load_config(path: &Path) -> Result<RunConfig> {
    RunConfig::from_file(path).with_context(|| format!("load config {}", path.display()))
}

fn make_provider(source: &SourceArgs) -> Result<Box<dyn PriceProvider>> {
    let provider: Box<dyn PriceProvider> = match source.provider {
        ProviderKind::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooProvider::new(breaker)?)
        }
        ProviderKind::Csv => {
            let Some(dir) = &source.data_dir else {
                bail!("--provider csv requires --data-dir");
            };
            Box::new(CsvDirProvider::new(dir.clone()))
        }
        ProviderKind::Synthetic => Box::new(SyntheticProvider::new()),
    };
    Ok(provider)
}

fn load_universe(args: &UniverseArgs) -> Result<SymbolUniverse> {
    match (&args.symbols, &args.symbols_file) {
        (Some(list), _) => Ok(SymbolUniverse::from_inline(list)),
        (None, Some(path)) => SymbolUniverse::from_file(path, args.symbols_column.as_deref())
            .with_context(|| format!("load symbols from {}", path.display())),
        (None, None) => bail!("provide --symbols or --symbols-file"),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_simulate_cmd(
    symbol: Option<String>,
    start: Option<String>,
    end: Option<String>,
    config: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    seed: Option<u64>,
    iterations: Option<usize>,
    source: SourceArgs,
    stdout: bool,
) -> Result<()> {
    let mut cfg = match &config {
        Some(path) => {
            let cfg = load_config(path)?;
            if !matches!(cfg.mode, RunMode::Single(_)) {
                bail!("{} is not a single-symbol config", path.display());
            }
            cfg
        }
        None => {
            let (Some(symbol), Some(start), Some(end)) = (&symbol, &start, &end) else {
                bail!("--symbol, --start and --end are required without --config");
            };
            RunConfig::new(RunMode::Single(SingleSymbolRun {
                symbol: symbol.clone(),
                start_date: parse_date(start)?,
                end_date: parse_date(end)?,
                to_stdout: stdout,
            }))
        }
    };

    if let RunMode::Single(single) = &mut cfg.mode {
        if let Some(s) = symbol {
            single.symbol = s;
        }
        if let Some(s) = &start {
            single.start_date = parse_date(s)?;
        }
        if let Some(e) = &end {
            single.end_date = parse_date(e)?;
        }
        single.to_stdout |= stdout;
    }
    if let Some(dir) = output_dir {
        cfg.output_dir = dir;
    }
    if let Some(n) = iterations {
        cfg.simulation.iterations = n;
    }
    cfg.seed = seed.or(cfg.seed);

    let provider = make_provider(&source)?;
    let store = FsArtifactStore::new(&cfg.output_dir);
    let mut out = std::io::stdout().lock();
    let report = run_single(&cfg, provider.as_ref(), &store, &mut out)?;

    match &report.outcome {
        JobOutcome::Success(key) => {
            if report.artifact.is_some() {
                println!(
                    "{}: {} paths -> {}",
                    report.symbol,
                    report.paths,
                    store.path_for(key)?.display()
                );
            }
            Ok(())
        }
        JobOutcome::DataUnavailable(reason) | JobOutcome::DateRangeMismatch(reason) => {
            eprintln!("{}: no simulation ({reason})", report.symbol);
            std::process::exit(1);
        }
    }
}

fn batch_config(
    start: Option<String>,
    end: Option<String>,
    universe: &UniverseArgs,
    config: Option<&Path>,
) -> Result<RunConfig> {
    let mut cfg = match config {
        Some(path) => {
            let cfg = load_config(path)?;
            if !matches!(cfg.mode, RunMode::Batch(_)) {
                bail!("{} is not a batch config", path.display());
            }
            cfg
        }
        None => {
            let (Some(start), Some(end)) = (&start, &end) else {
                bail!("--start and --end are required without --config");
            };
            RunConfig::new(RunMode::Batch(BatchRun {
                start_date: parse_date(start)?,
                end_date: parse_date(end)?,
                symbols: Vec::new(),
                symbols_file: None,
                symbols_column: None,
                no_wait: false,
            }))
        }
    };

    if let RunMode::Batch(batch) = &mut cfg.mode {
        if let Some(s) = &start {
            batch.start_date = parse_date(s)?;
        }
        if let Some(e) = &end {
            batch.end_date = parse_date(e)?;
        }
        if let Some(list) = &universe.symbols {
            batch.symbols = SymbolUniverse::from_inline(list).into_symbols();
            batch.symbols_file = None;
        }
        if let Some(path) = &universe.symbols_file {
            batch.symbols_file = Some(path.clone());
            batch.symbols_column = universe.symbols_column.clone();
        }
    }
    Ok(cfg)
}

fn run_batch_cmd(cfg: &RunConfig, source: &SourceArgs) -> Result<()> {
    let provider = make_provider(source)?;
    let store = FsArtifactStore::new(&cfg.output_dir);
    let report = run_batch(cfg, provider.as_ref(), &store)?;
    let s = &report.summary;

    println!("Namespace: {}", report.namespace);
    println!("Symbols:   {}", report.universe_size);
    println!(
        "Jobs:      {} succeeded, {} no data, {} window mismatch, {} write failures ({:.1}s)",
        s.succeeded,
        s.data_unavailable,
        s.date_range_mismatch,
        s.write_failures,
        s.elapsed.as_secs_f64()
    );
    if report.preexisting > 0 {
        println!(
            "Warning:   namespace held {} artifacts before dispatch",
            report.preexisting
        );
    }
    if let Some(completion) = &report.completion {
        print_completion(completion);
    }

    // Per-symbol failures are already recorded as artifacts.
    Ok(())
}

fn run_partition(universe: &UniverseArgs, rows: usize, output: &Path) -> Result<()> {
    let universe = load_universe(universe)?;
    let groups = SymbolPartitioner::new(rows)?.partition(universe.symbols());
    write_partition_file(output, &groups)
        .with_context(|| format!("write partition file {}", output.display()))?;

    info!(rows, path = %output.display(), "partition written");
    println!("{}", universe.len());
    Ok(())
}

fn run_await(
    start: &str,
    end: &str,
    expected: usize,
    output_dir: &Path,
    settings: &MonitorSettings,
) -> Result<()> {
    settings.validate()?;
    let namespace = run_namespace(parse_date(start)?, parse_date(end)?);
    let store = FsArtifactStore::new(output_dir);
    let report = CompletionMonitor::new(&store, namespace, expected)
        .with_settings(settings)
        .wait()?;

    print_completion(&report);
    if !report.is_complete() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_completion(report: &CompletionReport) {
    match report {
        CompletionReport::Complete {
            observed,
            expected,
            elapsed,
            polls,
        } => println!(
            "Complete:  {observed}/{expected} artifacts after {:.1}s ({polls} polls)",
            elapsed.as_secs_f64()
        ),
        CompletionReport::TimedOut {
            observed,
            expected,
            elapsed,
            polls,
        } => println!(
            "Timed out: {observed}/{expected} artifacts after {:.1}s ({polls} polls)",
            elapsed.as_secs_f64()
        ),
    }
}
