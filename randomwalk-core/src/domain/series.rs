//! Daily closing-price history for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("observation dated {date} precedes the previous observation {previous}")]
    UnorderedDates { previous: NaiveDate, date: NaiveDate },
}

/// Ordered-by-date closing prices for a single symbol.
///
/// Dates never go backwards. The series may be empty: providers hand back
/// whatever they received and the estimator decides whether it is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl HistoricalSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        if let Some(w) = points.windows(2).find(|w| w[1].date < w[0].date) {
            return Err(SeriesError::UnorderedDates {
                previous: w[0].date,
                date: w[1].date,
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            points,
        })
    }

    /// Skip the ordering check for points generated in date order.
    pub(crate) fn from_sorted(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date <= w[1].date));
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// Build a series from `(date, close)` pairs.
    pub fn from_pairs(
        symbol: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, SeriesError> {
        let points = pairs
            .into_iter()
            .map(|(date, close)| PricePoint::new(date, close))
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Last close: the starting price of every simulated path.
    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Calendar days between the first and last observation (0 when fewer than 2).
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn accepts_ascending_dates() {
        let s = HistoricalSeries::from_pairs(
            "AAPL",
            [(d(2018, 1, 2), 10.0), (d(2018, 1, 3), 11.0), (d(2018, 1, 5), 12.0)],
        )
        .unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.span_days(), 3);
        assert_eq!(s.last_close(), Some(12.0));
        assert_eq!(s.first_date(), Some(d(2018, 1, 2)));
    }

    #[test]
    fn rejects_dates_going_backwards() {
        let err = HistoricalSeries::from_pairs(
            "AAPL",
            [(d(2018, 1, 3), 10.0), (d(2018, 1, 2), 11.0)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            SeriesError::UnorderedDates {
                previous: d(2018, 1, 3),
                date: d(2018, 1, 2)
            }
        );
    }

    #[test]
    fn repeated_dates_are_kept() {
        let s = HistoricalSeries::from_pairs(
            "AAPL",
            [(d(2018, 1, 2), 10.0), (d(2018, 1, 2), 10.5)],
        )
        .unwrap();
        assert_eq!(s.span_days(), 0);
    }

    #[test]
    fn empty_series() {
        let s = HistoricalSeries::new("ZZZZ", Vec::new()).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.span_days(), 0);
        assert_eq!(s.last_close(), None);
    }
}
