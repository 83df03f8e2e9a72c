use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every run namespace in the artifact store.
pub const NAMESPACE_PREFIX: &str = "stock_simulations_based_on";

/// Identifier of one simulation run.
///
/// Wraps a 32-byte BLAKE3 digest so it can feed straight into sub-seed
/// derivation (see [`crate::rng::RngHierarchy`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub [u8; 32]);

impl RunId {
    /// Hash arbitrary bytes into a run id.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Run id for the historical window `[start, end]`.
    ///
    /// Every machine working on the same window derives the same id, so a
    /// seeded run is reproducible across the cluster.
    pub fn for_window(start: NaiveDate, end: NaiveDate) -> Self {
        Self::from_bytes(run_namespace(start, end).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// Run-scoped artifact namespace, e.g. `stock_simulations_based_on_2017-01-01_2019-01-01`.
pub fn run_namespace(start: NaiveDate, end: NaiveDate) -> String {
    format!("{NAMESPACE_PREFIX}_{start}_{end}")
}

/// Whether `symbol` can name a file inside a namespace directory.
///
/// Rejects empty names, `.`/`..` and anything carrying a path separator.
pub fn is_file_safe_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol != "."
        && symbol != ".."
        && !symbol.contains(['/', '\\', '\0'])
}
