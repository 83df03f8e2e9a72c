//! Offline provider backed by a directory of per-symbol CSV files.
//!
//! Layout: `{dir}/{SYMBOL}.csv` with a header row containing `date` and
//! `close` columns (case-insensitive, any order, extra columns ignored).
//! Yahoo's CSV download format (`Date,Open,High,Low,Close,Adj Close,Volume`)
//! works as-is.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::provider::{DataError, DataSource, PriceProvider};
use crate::domain::{is_file_safe_symbol, HistoricalSeries, PricePoint};

pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl PriceProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv_directory"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvDirectory
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoricalSeries, DataError> {
        if !is_file_safe_symbol(symbol) {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let path = self.symbol_path(symbol);
        if !path.is_file() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    DataError::Other(format!("{}: missing '{name}' column", path.display()))
                })
        };
        let date_col = column("date")?;
        let close_col = column("close")?;

        let mut points = Vec::new();
        for record in reader.records() {
            let record = record?;
            let raw_date = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
                DataError::Other(format!("{}: bad date '{raw_date}': {e}", path.display()))
            })?;
            if date < start || date > end {
                continue;
            }
            // "null" and empty closes are skipped, like missing sessions.
            let raw_close = record.get(close_col).unwrap_or_default().trim();
            if let Ok(close) = raw_close.parse::<f64>() {
                points.push(PricePoint::new(date, close));
            }
        }

        if points.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(HistoricalSeries::new(symbol, points)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn reads_yahoo_style_file_within_range() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("AAPL.csv"),
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2016-12-30,116.6,116.8,115.4,115.82,110.0,30586300\n\
             2017-01-03,115.8,116.3,114.7,116.15,110.3,28781900\n\
             2017-01-04,115.8,116.5,115.7,116.02,110.2,21118100\n\
             2017-01-05,115.9,116.8,115.8,null,110.8,22193600\n",
        )
        .unwrap();

        let provider = CsvDirProvider::new(dir.path());
        let series = provider.fetch("AAPL", d(2017, 1, 1), d(2019, 1, 1)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(d(2017, 1, 3)));
        assert_eq!(series.last_close(), Some(116.02));
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDirProvider::new(dir.path());
        assert!(matches!(
            provider.fetch("ZZZZ", d(2017, 1, 1), d(2019, 1, 1)),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn path_like_symbol_never_leaves_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let prices = root.path().join("prices");
        std::fs::create_dir_all(&prices).unwrap();
        std::fs::write(
            root.path().join("SECRET.csv"),
            "Date,Close\n2017-01-03,1.0\n2017-01-04,2.0\n",
        )
        .unwrap();

        let provider = CsvDirProvider::new(&prices);
        assert!(matches!(
            provider.fetch("../SECRET", d(2017, 1, 1), d(2019, 1, 1)),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn missing_close_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BAD.csv"), "date,price\n2017-01-03,1.0\n").unwrap();
        let provider = CsvDirProvider::new(dir.path());
        assert!(matches!(
            provider.fetch("BAD", d(2017, 1, 1), d(2019, 1, 1)),
            Err(DataError::Other(_))
        ));
    }
}
