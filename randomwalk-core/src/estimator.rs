//! Growth-rate and volatility estimation from a closing-price history.
//!
//! - `cagr = (P_last / P_second)^(365 / D) - 1`, D = calendar days first→last
//! - `returns[i] = close[i] / close[i-1] - 1`
//! - `volatility = sample_stdev(returns) * sqrt(252)`
//!
//! The CAGR base is the *second* observation, not the first. That matches the
//! numbers the model has always produced and is kept as-is.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{HistoricalSeries, CALENDAR_DAYS_PER_YEAR, TRADING_DAYS};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("insufficient history: need at least 2 observations, got {observations}")]
    InsufficientHistory { observations: usize },

    #[error("degenerate interval: first and last observation are both dated {date}")]
    DegenerateInterval { date: NaiveDate },

    #[error("non-finite {field} estimate: {value}")]
    NonFiniteEstimate { field: &'static str, value: f64 },
}

/// Annualised drift and volatility for one symbol.
///
/// Both values are finite and volatility is non-negative; the constructor
/// enforces it so the simulator never sees NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    cagr: f64,
    volatility: f64,
}

impl SimulationParams {
    pub fn new(cagr: f64, volatility: f64) -> Result<Self, EstimateError> {
        if !cagr.is_finite() {
            return Err(EstimateError::NonFiniteEstimate {
                field: "cagr",
                value: cagr,
            });
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(EstimateError::NonFiniteEstimate {
                field: "volatility",
                value: volatility,
            });
        }
        Ok(Self { cagr, volatility })
    }

    pub fn cagr(&self) -> f64 {
        self.cagr
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Mean of the daily return distribution.
    pub fn daily_mean(&self, trading_days: usize) -> f64 {
        self.cagr / trading_days as f64
    }

    /// Standard deviation of the daily return distribution.
    pub fn daily_std_dev(&self, trading_days: usize) -> f64 {
        self.volatility / (trading_days as f64).sqrt()
    }
}

/// Derives [`SimulationParams`] from a [`HistoricalSeries`].
#[derive(Debug, Clone, Copy)]
pub struct HistoricalStatsEstimator {
    trading_days_per_year: usize,
}

impl Default for HistoricalStatsEstimator {
    fn default() -> Self {
        Self {
            trading_days_per_year: TRADING_DAYS,
        }
    }
}

impl HistoricalStatsEstimator {
    pub fn new(trading_days_per_year: usize) -> Self {
        Self {
            trading_days_per_year,
        }
    }

    pub fn estimate(&self, series: &HistoricalSeries) -> Result<SimulationParams, EstimateError> {
        let points = series.points();
        if points.len() < 2 {
            return Err(EstimateError::InsufficientHistory {
                observations: points.len(),
            });
        }

        let days = series.span_days();
        if days == 0 {
            return Err(EstimateError::DegenerateInterval {
                date: points[0].date,
            });
        }

        let last = points[points.len() - 1].close;
        let second = points[1].close;
        let cagr = (last / second).powf(CALENDAR_DAYS_PER_YEAR / days as f64) - 1.0;

        let closes = series.closes();
        // A flat history has zero volatility even when it yields a single return.
        let volatility = if closes.windows(2).all(|w| w[0] == w[1]) {
            0.0
        } else {
            sample_std_dev(&daily_returns(&closes)) * (self.trading_days_per_year as f64).sqrt()
        };

        SimulationParams::new(cagr, volatility)
    }
}

/// Simple percentage returns; the undefined first element is dropped.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Sample standard deviation (n - 1 denominator). NaN for fewer than 2 values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(closes: &[f64]) -> HistoricalSeries {
        let start = NaiveDate::from_ymd_opt(2017, 1, 3).unwrap();
        HistoricalSeries::from_pairs(
            "TEST",
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| (start + Duration::days(i as i64), c)),
        )
        .unwrap()
    }

    #[test]
    fn constant_prices_have_zero_volatility() {
        let params = HistoricalStatsEstimator::default()
            .estimate(&series(&[50.0; 30]))
            .unwrap();
        assert_eq!(params.volatility(), 0.0);
        assert_eq!(params.cagr(), 0.0);
    }

    #[test]
    fn two_equal_prices_have_zero_volatility() {
        let params = HistoricalStatsEstimator::default()
            .estimate(&series(&[50.0, 50.0]))
            .unwrap();
        assert_eq!(params.volatility(), 0.0);
        assert_eq!(params.cagr(), 0.0);
    }

    #[test]
    fn cagr_uses_second_observation_as_base() {
        // First close is wildly off; only the second one matters.
        let s = series(&[1.0, 100.0, 105.0, 110.0]);
        let params = HistoricalStatsEstimator::default().estimate(&s).unwrap();
        let expected = (110.0_f64 / 100.0).powf(365.0 / 3.0) - 1.0;
        assert!((params.cagr() - expected).abs() < 1e-9 * expected.abs());
    }

    #[test]
    fn volatility_matches_hand_computation() {
        let s = series(&[100.0, 110.0, 99.0]);
        let params = HistoricalStatsEstimator::default().estimate(&s).unwrap();
        // returns: +0.10, -0.10 → mean 0, sample var = 0.02
        let expected = 0.02_f64.sqrt() * 252.0_f64.sqrt();
        assert!((params.volatility() - expected).abs() < 1e-12);
    }

    #[test]
    fn single_observation_is_insufficient() {
        let err = HistoricalStatsEstimator::default()
            .estimate(&series(&[10.0]))
            .unwrap_err();
        assert_eq!(err, EstimateError::InsufficientHistory { observations: 1 });
    }

    #[test]
    fn empty_series_is_insufficient() {
        let s = HistoricalSeries::new("TEST", Vec::new()).unwrap();
        let err = HistoricalStatsEstimator::default().estimate(&s).unwrap_err();
        assert_eq!(err, EstimateError::InsufficientHistory { observations: 0 });
    }

    #[test]
    fn same_day_observations_are_degenerate() {
        let day = NaiveDate::from_ymd_opt(2018, 6, 1).unwrap();
        let s = HistoricalSeries::from_pairs("TEST", [(day, 10.0), (day, 11.0)]).unwrap();
        let err = HistoricalStatsEstimator::default().estimate(&s).unwrap_err();
        assert_eq!(err, EstimateError::DegenerateInterval { date: day });
    }

    #[test]
    fn two_points_have_no_sample_deviation() {
        let err = HistoricalStatsEstimator::default()
            .estimate(&series(&[10.0, 11.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            EstimateError::NonFiniteEstimate {
                field: "volatility",
                ..
            }
        ));
    }

    #[test]
    fn nan_close_is_rejected() {
        let err = HistoricalStatsEstimator::default()
            .estimate(&series(&[10.0, 11.0, f64::NAN, 12.0]))
            .unwrap_err();
        assert!(matches!(err, EstimateError::NonFiniteEstimate { .. }));
    }

    #[test]
    fn zero_base_price_is_rejected() {
        let err = HistoricalStatsEstimator::default()
            .estimate(&series(&[10.0, 0.0, 12.0, 13.0]))
            .unwrap_err();
        assert!(matches!(err, EstimateError::NonFiniteEstimate { .. }));
    }

    #[test]
    fn params_reject_negative_volatility() {
        assert!(SimulationParams::new(0.1, -0.2).is_err());
        assert!(SimulationParams::new(f64::INFINITY, 0.2).is_err());
        let p = SimulationParams::new(0.252, 0.2).unwrap();
        assert!((p.daily_mean(252) - 0.001).abs() < 1e-15);
        assert!((p.daily_std_dev(252) - 0.2 / 252.0_f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn sample_std_dev_basics() {
        assert!(sample_std_dev(&[1.0]).is_nan());
        assert_eq!(sample_std_dev(&[2.0, 2.0, 2.0]), 0.0);
        assert!((sample_std_dev(&[1.0, 2.0, 3.0, 4.0]) - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn daily_returns_drop_first_element() {
        let r = daily_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
    }
}
