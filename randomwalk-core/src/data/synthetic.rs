//! Deterministic synthetic prices for development and tests.
//!
//! Produces a weekday-only random walk from a starting price of 100.0, seeded
//! from the symbol name, so the same symbol always yields the same history.
//! Clearly fake; never use the output for anything but plumbing checks.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataSource, PriceProvider};
use crate::domain::{HistoricalSeries, PricePoint};

#[derive(Debug, Default)]
pub struct SyntheticProvider {
    unknown: HashSet<String>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols that should fail like a delisted ticker.
    pub fn with_unknown<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unknown.extend(symbols.into_iter().map(Into::into));
        self
    }
}

/// Weekday closes for `symbol` over `[start, end]`.
pub fn synthetic_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> HistoricalSeries {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut points = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;
    while current <= end {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            price *= 1.0 + rng.gen_range(-0.03..0.03);
            points.push(PricePoint::new(current, price));
        }
        current += Duration::days(1);
    }

    HistoricalSeries::from_sorted(symbol, points)
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoricalSeries, DataError> {
        if self.unknown.contains(symbol) {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(synthetic_series(symbol, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekdays_only_and_deterministic() {
        let a = synthetic_series("AAPL", d(2018, 1, 1), d(2018, 1, 14));
        let b = synthetic_series("AAPL", d(2018, 1, 1), d(2018, 1, 14));
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a
            .points()
            .iter()
            .all(|p| !matches!(p.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn symbols_get_different_walks() {
        let a = synthetic_series("AAPL", d(2018, 1, 1), d(2018, 3, 1));
        let b = synthetic_series("MSFT", d(2018, 1, 1), d(2018, 3, 1));
        assert_ne!(a.closes(), b.closes());
    }

    #[test]
    fn unknown_symbols_fail() {
        let provider = SyntheticProvider::new().with_unknown(["ZZZZ"]);
        assert!(provider.fetch("ZZZZ", d(2018, 1, 1), d(2018, 2, 1)).is_err());
        assert!(provider.fetch("AAPL", d(2018, 1, 1), d(2018, 2, 1)).is_ok());
    }
}
