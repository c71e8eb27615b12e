//! Hash functions used across the ledger.

use sha2::Sha256;
use sha3::{Digest, Sha3_256};

/// Compute a SHA3-256 digest of arbitrary data.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha3_256::digest(data));
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn sha3_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// SHA3-256 of `data`, hex encoded.
pub fn sha3_256_hex(data: &[u8]) -> String {
    hex::encode(sha3_256(data))
}

/// Compute a SHA-256 digest of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha256::digest(data));
    output
}
