//! In-memory provider for tests and embedding callers that already hold prices.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::provider::{DataError, DataSource, PriceProvider};
use crate::domain::HistoricalSeries;

#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    series: HashMap<String, HistoricalSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: HistoricalSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    pub fn with_series(mut self, series: HistoricalSeries) -> Self {
        self.insert(series);
        self
    }
}

impl PriceProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn source(&self) -> DataSource {
        DataSource::InMemory
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoricalSeries, DataError> {
        let stored = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let points = stored
            .points()
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();
        Ok(HistoricalSeries::from_sorted(symbol, points))
    }
}
