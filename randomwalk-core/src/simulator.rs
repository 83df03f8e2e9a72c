//! Monte-Carlo random walk over daily gross-return factors.
//!
//! Each path starts at the last historical close and compounds
//! `1 + N(cagr / T, volatility / sqrt(T))` draws, one per trading day:
//!
//! ```text
//! price[0] = starting_price
//! price[k] = price[k-1] * (1 + sample_k)
//! ```
//!
//! This is an additive-normal approximation, not log-normal GBM. The
//! recurrence is reproduced exactly as the model defines it.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::domain::{SimulatedPath, TRADING_DAYS};
use crate::estimator::SimulationParams;

/// Default number of paths per symbol.
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Position tags are `10 * k` for `k` drawn uniformly from this range.
pub const POSITION_TAG_RANGE: std::ops::RangeInclusive<u32> = 10..=1000;

/// Generates simulated price paths for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct PathSimulator {
    iterations: usize,
    trading_days: usize,
}

impl Default for PathSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PathSimulator {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            trading_days: TRADING_DAYS,
        }
    }

    /// Override the horizon. Also used as the annualisation divisor.
    pub fn with_trading_days(mut self, trading_days: usize) -> Self {
        self.trading_days = trading_days;
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn trading_days(&self) -> usize {
        self.trading_days
    }

    /// Draw the per-symbol position tag, uniform over {100, 110, ..., 10000}.
    pub fn draw_position_tag<R: Rng>(rng: &mut R) -> u32 {
        10 * rng.gen_range(POSITION_TAG_RANGE)
    }

    /// Simulate all paths for `symbol`.
    ///
    /// One position tag is drawn first and shared by every path.
    pub fn simulate<R: Rng>(
        &self,
        symbol: &str,
        params: &SimulationParams,
        starting_price: f64,
        rng: &mut R,
    ) -> Vec<SimulatedPath> {
        let position_tag = Self::draw_position_tag(rng);
        (0..self.iterations)
            .map(|i| self.simulate_path(symbol, params, starting_price, position_tag, i, rng))
            .collect()
    }

    /// Simulate a single path of `trading_days + 1` prices.
    pub fn simulate_path<R: Rng>(
        &self,
        symbol: &str,
        params: &SimulationParams,
        starting_price: f64,
        position_tag: u32,
        path_index: usize,
        rng: &mut R,
    ) -> SimulatedPath {
        let mean = params.daily_mean(self.trading_days);
        let sd = params.daily_std_dev(self.trading_days);

        let mut prices = Vec::with_capacity(self.trading_days + 1);
        prices.push(starting_price);
        let mut price = starting_price;
        for _ in 0..self.trading_days {
            let z: f64 = rng.sample(StandardNormal);
            let factor = 1.0 + mean + sd * z;
            price *= factor;
            prices.push(price);
        }

        SimulatedPath {
            symbol: symbol.to_string(),
            position_tag,
            path_index,
            prices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(cagr: f64, vol: f64) -> SimulationParams {
        SimulationParams::new(cagr, vol).unwrap()
    }

    #[test]
    fn paths_have_expected_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let paths = PathSimulator::new(25).simulate("AAPL", &params(0.1, 0.3), 157.5, &mut rng);
        assert_eq!(paths.len(), 25);
        for (i, p) in paths.iter().enumerate() {
            assert_eq!(p.path_index, i);
            assert_eq!(p.prices.len(), TRADING_DAYS + 1);
            assert_eq!(p.starting_price(), 157.5);
            assert_eq!(p.symbol, "AAPL");
        }
    }

    #[test]
    fn position_tag_is_shared_and_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let paths = PathSimulator::new(10).simulate("MSFT", &params(0.05, 0.2), 90.0, &mut rng);
        let tag = paths[0].position_tag;
        assert!(paths.iter().all(|p| p.position_tag == tag));
        assert_eq!(tag % 10, 0);
        assert!((100..=10_000).contains(&tag));
    }

    #[test]
    fn zero_volatility_compounds_the_drift_exactly() {
        let mut rng = StdRng::seed_from_u64(1);
        let sim = PathSimulator::new(1);
        let path = sim.simulate_path("X", &params(0.252, 0.0), 100.0, 500, 0, &mut rng);
        // daily factor is exactly 1.001
        let mut expected = 100.0;
        for k in 1..=TRADING_DAYS {
            expected *= 1.001;
            assert!((path.prices[k] - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn each_step_multiplies_the_previous_price() {
        let mut rng = StdRng::seed_from_u64(3);
        let path = PathSimulator::new(1)
            .with_trading_days(5)
            .simulate_path("X", &params(0.1, 0.4), 50.0, 100, 0, &mut rng);
        assert_eq!(path.prices.len(), 6);

        // Replay the same draws and rebuild the recurrence by hand.
        let mut replay = StdRng::seed_from_u64(3);
        let mean = 0.1 / 5.0;
        let sd = 0.4 / 5.0_f64.sqrt();
        let mut price = 50.0;
        for k in 1..=5 {
            let z: f64 = replay.sample(StandardNormal);
            price *= 1.0 + mean + sd * z;
            assert_eq!(path.prices[k], price);
        }
    }

    #[test]
    fn same_seed_same_paths() {
        let sim = PathSimulator::new(5);
        let p = params(0.08, 0.25);
        let a = sim.simulate("AAPL", &p, 100.0, &mut StdRng::seed_from_u64(42));
        let b = sim.simulate("AAPL", &p, 100.0, &mut StdRng::seed_from_u64(42));
        let c = sim.simulate("AAPL", &p, 100.0, &mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn position_tags_cover_both_ends_eventually() {
        let mut rng = StdRng::seed_from_u64(99);
        let tags: Vec<u32> = (0..20_000)
            .map(|_| PathSimulator::draw_position_tag(&mut rng))
            .collect();
        assert!(tags.iter().all(|t| (100..=10_000).contains(t) && t % 10 == 0));
        assert!(tags.contains(&100));
        assert!(tags.contains(&10_000));
    }
}
