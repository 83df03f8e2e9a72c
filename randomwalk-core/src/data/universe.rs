//! Symbol universe: the ordered list of tickers a batch run dispatches.
//!
//! Sources:
//! - inline, comma-separated (`AAPL,MSFT,GOOG`)
//! - a plain file with symbols separated by commas and/or newlines
//! - a headered CSV listing (e.g. the Nasdaq symbol directory), picking one
//!   named column such as `NASDAQ Symbol`
//!
//! Order is preserved. A repeated symbol is dropped after its first
//! occurrence, and so is any symbol that cannot name an artifact file: the
//! universe size is the completion barrier's expected artifact count, and
//! each symbol must map to exactly one artifact.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::domain::is_file_safe_symbol;
use crate::partition::parse_row;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read symbol file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("symbol file {path} has no '{column}' column")]
    MissingColumn { path: String, column: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolUniverse {
    symbols: Vec<String>,
}

impl SymbolUniverse {
    pub fn new(symbols: Vec<String>) -> Self {
        let mut seen = HashSet::with_capacity(symbols.len());
        let symbols = symbols
            .into_iter()
            .filter(|symbol| {
                if !is_file_safe_symbol(symbol) {
                    warn!(%symbol, "dropping symbol that cannot name an artifact");
                    return false;
                }
                if !seen.insert(symbol.clone()) {
                    warn!(%symbol, "dropping duplicate symbol");
                    return false;
                }
                true
            })
            .collect();
        Self { symbols }
    }

    pub fn from_inline(list: &str) -> Self {
        Self::new(parse_row(list))
    }

    /// Load symbols from a file.
    ///
    /// With `column`, the file is a headered CSV and only that column is read.
    /// Without it, every non-blank field of every line is a symbol.
    pub fn from_file(path: &Path, column: Option<&str>) -> Result<Self, UniverseError> {
        let read_err = |source| UniverseError::Read {
            path: path.display().to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(column.is_some())
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(read_err)?;

        let index = match column {
            Some(name) => {
                let headers = reader.headers().map_err(read_err)?;
                let found = headers.iter().position(|h| h == name);
                Some(found.ok_or_else(|| UniverseError::MissingColumn {
                    path: path.display().to_string(),
                    column: name.to_string(),
                })?)
            }
            None => None,
        };

        let mut symbols = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            match index {
                Some(i) => {
                    if let Some(s) = record.get(i).filter(|s| !s.is_empty()) {
                        symbols.push(s.to_string());
                    }
                }
                None => symbols.extend(
                    record
                        .iter()
                        .filter(|s| !s.is_empty())
                        .map(String::from),
                ),
            }
        }

        Ok(Self::new(symbols))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn into_symbols(self) -> Vec<String> {
        self.symbols
    }
}
