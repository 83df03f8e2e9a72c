use serde::{Deserialize, Serialize};

/// One Monte-Carlo price path.
///
/// `prices[0]` is the starting price; the path has `trading_days + 1` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedPath {
    pub symbol: String,
    pub position_tag: u32,
    pub path_index: usize,
    pub prices: Vec<f64>,
}

impl SimulatedPath {
    pub fn starting_price(&self) -> f64 {
        self.prices[0]
    }

    pub fn terminal_price(&self) -> f64 {
        self.prices[self.prices.len() - 1]
    }

    /// Number of simulated steps (excludes the starting price).
    pub fn steps(&self) -> usize {
        self.prices.len().saturating_sub(1)
    }

    /// Flatten into an artifact row:
    /// `symbol, position_tag, path_index, starting_price, price_1, ..., price_n`.
    pub fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(3 + self.prices.len());
        record.push(self.symbol.clone());
        record.push(self.position_tag.to_string());
        record.push(self.path_index.to_string());
        record.extend(self.prices.iter().map(|p| p.to_string()));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout() {
        let path = SimulatedPath {
            symbol: "AAPL".into(),
            position_tag: 420,
            path_index: 7,
            prices: vec![100.0, 101.5, 99.25],
        };
        assert_eq!(
            path.to_record(),
            vec!["AAPL", "420", "7", "100", "101.5", "99.25"]
        );
        assert_eq!(path.steps(), 2);
        assert_eq!(path.terminal_price(), 99.25);
    }
}
