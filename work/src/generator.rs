//! PoW nonce search (multi-threaded CPU).

use merit_types::{BlockHash, NodeHash};
use rand::RngCore;
use rayon::prelude::*;

use crate::difficulty::Difficulty;
use crate::error::WorkError;
use crate::validator::validate_work;

/// Default number of nonces tried per [`WorkGenerator::generate`] call.
pub const DEFAULT_BATCH: u64 = 50_000;

/// A random nonce: 16 random bytes, hex encoded.
pub fn random_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Searches random nonces across all available CPU cores.
///
/// One call tries at most `batch` nonces, so a caller can re-check whether
/// its candidate block is still worth sealing between rounds.
#[derive(Clone, Copy, Debug)]
pub struct WorkGenerator {
    batch: u64,
}

impl Default for WorkGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH)
    }
}

impl WorkGenerator {
    pub fn new(batch: u64) -> Self {
        Self {
            batch: batch.max(1),
        }
    }

    pub fn batch(&self) -> u64 {
        self.batch
    }

    /// Find a nonce sealing (`parent`, `root`) at `difficulty`.
    ///
    /// The first thread to find one stops the rest.
    pub fn generate(
        &self,
        parent: &BlockHash,
        root: &NodeHash,
        difficulty: &Difficulty,
    ) -> Result<String, WorkError> {
        (0..self.batch)
            .into_par_iter()
            .find_map_any(|_| {
                let nonce = random_nonce();
                validate_work(parent, &nonce, root, difficulty).then_some(nonce)
            })
            .ok_or(WorkError::Exhausted {
                attempts: self.batch,
            })
    }
}
