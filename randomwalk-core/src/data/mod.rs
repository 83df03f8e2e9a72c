//! Price providers and symbol universes

pub mod circuit_breaker;
pub mod csv_dir;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_dir::CsvDirProvider;
pub use memory::InMemoryProvider;
pub use provider::{DataError, DataSource, PriceProvider};
pub use synthetic::{synthetic_series, SyntheticProvider};
pub use universe::{SymbolUniverse, UniverseError};
pub use yahoo::YahooProvider;
