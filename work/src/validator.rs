//! PoW validation.

use merit_crypto::sha3_256_multi;
use merit_types::{BlockHash, NodeHash};

use crate::difficulty::Difficulty;

/// Hex SHA3-256 of `parent_hex ++ nonce ++ root_hex`.
pub fn pow_hash(parent: &BlockHash, nonce: &str, root: &NodeHash) -> String {
    let parent_hex = parent.to_hex();
    let root_hex = root.to_hex();
    hex::encode(sha3_256_multi(&[
        parent_hex.as_bytes(),
        nonce.as_bytes(),
        root_hex.as_bytes(),
    ]))
}

/// Whether `nonce` seals a block with this parent and trie root.
pub fn validate_work(parent: &BlockHash, nonce: &str, root: &NodeHash, difficulty: &Difficulty) -> bool {
    difficulty.is_met_by(&pow_hash(parent, nonce, root))
}
