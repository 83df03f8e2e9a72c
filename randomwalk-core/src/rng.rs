//! Deterministic RNG hierarchy.
//!
//! A master seed generates a sub-seed for each `(run_id, symbol)` job.
//! Sub-seeds are derived via BLAKE3 hashing, independently of worker
//! scheduling order, so a seeded run produces identical paths regardless of
//! pool size or which machine picked up the symbol.

use crate::domain::RunId;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (run_id, symbol).
    pub fn sub_seed(&self, run_id: &RunId, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(&run_id.0);
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    /// Create a seeded StdRng for one job.
    pub fn rng_for(&self, run_id: &RunId, symbol: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(run_id, symbol))
    }
}

/// Per-job generator: seeded through the hierarchy when a master seed is
/// configured, OS entropy otherwise.
pub fn job_rng(hierarchy: Option<&RngHierarchy>, run_id: &RunId, symbol: &str) -> StdRng {
    match hierarchy {
        Some(h) => h.rng_for(run_id, symbol),
        None => StdRng::from_entropy(),
    }
}
