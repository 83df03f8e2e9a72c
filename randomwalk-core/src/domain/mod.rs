//! Domain types: price history, simulated paths, run identifiers.

pub mod ids;
pub mod path;
pub mod series;

pub use ids::{is_file_safe_symbol, run_namespace, RunId, NAMESPACE_PREFIX};
pub use path::SimulatedPath;
pub use series::{HistoricalSeries, PricePoint, SeriesError};

/// Assumed number of market sessions per year. Also the simulation horizon.
pub const TRADING_DAYS: usize = 252;

/// Calendar days per year used to annualise the growth rate.
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;
