//! Random-walk core: estimator, path simulator, partitioner, price providers.
//!
//! This crate holds the numeric heart of the simulation:
//! - Domain types (price history, simulated paths, run ids)
//! - Growth-rate and volatility estimation from closing prices
//! - Monte-Carlo path generation with an injected, seedable RNG
//! - Symbol-universe partitioning into rows of distributed work
//! - Price provider trait with Yahoo, CSV-directory, synthetic and in-memory sources

pub mod data;
pub mod domain;
pub mod estimator;
pub mod partition;
pub mod rng;
pub mod simulator;

pub use domain::{HistoricalSeries, PricePoint, RunId, SimulatedPath, TRADING_DAYS};
pub use estimator::{EstimateError, HistoricalStatsEstimator, SimulationParams};
pub use partition::{PartitionError, PartitionGroup, SymbolPartitioner};
pub use rng::RngHierarchy;
pub use simulator::{PathSimulator, DEFAULT_ITERATIONS};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a worker thread touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<HistoricalSeries>();
        require_sync::<HistoricalSeries>();
        require_send::<SimulatedPath>();
        require_sync::<SimulatedPath>();
        require_send::<SimulationParams>();
        require_sync::<SimulationParams>();
        require_send::<HistoricalStatsEstimator>();
        require_sync::<HistoricalStatsEstimator>();
        require_send::<PathSimulator>();
        require_sync::<PathSimulator>();
        require_send::<RngHierarchy>();
        require_sync::<RngHierarchy>();
        require_send::<RunId>();
        require_sync::<RunId>();
        require_send::<PartitionGroup>();
        require_sync::<PartitionGroup>();

        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvDirProvider>();
        require_sync::<data::CsvDirProvider>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::DataError>();
    }

    /// The price provider trait must stay object-safe: the runner stores it as
    /// `&dyn PriceProvider` and shares it across the pool.
    #[test]
    fn price_provider_is_object_safe() {
        fn _takes_dyn(p: &dyn data::PriceProvider) -> &str {
            p.name()
        }
        let provider = data::InMemoryProvider::new();
        assert_eq!(_takes_dyn(&provider), "in_memory");
    }
}
