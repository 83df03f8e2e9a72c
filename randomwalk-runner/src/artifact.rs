//! Artifact naming and encoding.
//!
//! Every job writes exactly one artifact under the run namespace:
//! - success: `{SYMBOL}`, one headerless CSV row per simulated path
//! - failure: `{SYMBOL}_empty` or `{SYMBOL}_mismatch`, a single
//!   `reason_code: detail` line

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use randomwalk_core::domain::run_namespace;
use randomwalk_core::SimulatedPath;

/// Why a job produced a failure artifact instead of paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Fetch failed, the symbol is unknown, or the history was unusable.
    NoHistoricalData,
    /// The returned history does not line up with the requested window.
    TimeIntervalMismatch,
}

impl FailureReason {
    pub fn code(self) -> &'static str {
        match self {
            FailureReason::NoHistoricalData => "no_historical_data",
            FailureReason::TimeIntervalMismatch => "time_interval_mismatch",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            FailureReason::NoHistoricalData => "empty",
            FailureReason::TimeIntervalMismatch => "mismatch",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "no_historical_data" => Some(FailureReason::NoHistoricalData),
            "time_interval_mismatch" => Some(FailureReason::TimeIntervalMismatch),
            _ => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Location of one artifact in a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub namespace: String,
    pub name: String,
}

impl ArtifactKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn success(start: NaiveDate, end: NaiveDate, symbol: &str) -> Self {
        Self::new(run_namespace(start, end), symbol)
    }

    pub fn failure(start: NaiveDate, end: NaiveDate, symbol: &str, reason: FailureReason) -> Self {
        Self::new(
            run_namespace(start, end),
            format!("{symbol}_{}", reason.suffix()),
        )
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Encode simulated paths as headerless CSV, one row per path.
pub fn encode_paths(paths: &[SimulatedPath]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for path in paths {
        writer.write_record(path.to_record())?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Encode the single-line failure artifact.
pub fn encode_failure(reason: FailureReason, detail: &str) -> Vec<u8> {
    let detail = detail.replace(['\r', '\n'], " ");
    format!("{}: {detail}\n", reason.code()).into_bytes()
}

/// Parse a failure artifact back into its reason and detail.
pub fn decode_failure(bytes: &[u8]) -> Option<(FailureReason, String)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let line = text.lines().next()?;
    let (code, detail) = line.split_once(':')?;
    Some((FailureReason::from_code(code)?, detail.trim().to_string()))
}

/// Read a success artifact back into raw rows.
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(bytes);
    reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(String::from).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn key_names() {
        let (s, e) = (d(2017, 1, 1), d(2019, 1, 1));
        let ok = ArtifactKey::success(s, e, "AAPL");
        assert_eq!(ok.namespace, "stock_simulations_based_on_2017-01-01_2019-01-01");
        assert_eq!(ok.name, "AAPL");

        let empty = ArtifactKey::failure(s, e, "ZZZZ", FailureReason::NoHistoricalData);
        assert_eq!(empty.name, "ZZZZ_empty");
        let mismatch = ArtifactKey::failure(s, e, "ZZZZ", FailureReason::TimeIntervalMismatch);
        assert_eq!(mismatch.name, "ZZZZ_mismatch");
        assert_eq!(
            mismatch.to_string(),
            "stock_simulations_based_on_2017-01-01_2019-01-01/ZZZZ_mismatch"
        );
    }

    #[test]
    fn paths_encode_one_row_each() {
        let paths: Vec<SimulatedPath> = (0..3)
            .map(|i| SimulatedPath {
                symbol: "AAPL".into(),
                position_tag: 500,
                path_index: i,
                prices: vec![100.0, 101.0, 102.5],
            })
            .collect();
        let bytes = encode_paths(&paths).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(text.lines().next(), Some("AAPL,500,0,100,101,102.5"));

        let rows = decode_rows(&bytes).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][2], "2");
    }

    #[test]
    fn failure_is_a_single_tagged_line() {
        let bytes = encode_failure(FailureReason::NoHistoricalData, "symbol not found:\nZZZZ");
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("no_historical_data: "));

        let (reason, detail) = decode_failure(&bytes).unwrap();
        assert_eq!(reason, FailureReason::NoHistoricalData);
        assert_eq!(detail, "symbol not found: ZZZZ");
    }

    #[test]
    fn unknown_reason_code_does_not_decode() {
        assert!(decode_failure(b"out_of_memory: boom\n").is_none());
    }
}
