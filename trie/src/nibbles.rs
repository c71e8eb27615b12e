//! Nibble paths and the compact (hex-prefix) encoding.
//!
//! A key becomes two nibbles per byte, high nibble first. Leaf paths carry a
//! trailing [`TERMINATOR`]; the compact encoding folds it into the flag
//! nibble:
//!
//! | flag | meaning            |
//! |------|--------------------|
//! | 0    | extension, even    |
//! | 1    | extension, odd     |
//! | 2    | leaf, even         |
//! | 3    | leaf, odd          |
//!
//! Odd-length paths share the first byte with the flag; even-length paths
//! get a zero pad nibble.

use crate::error::TrieError;

/// Marker appended to a leaf's nibble path.
pub const TERMINATOR: u8 = 16;

/// Convert a string key into its nibble path.
pub fn key_to_nibbles(key: &str) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(key.len() * 2);
    for byte in key.as_bytes() {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Length of the shared prefix of two nibble paths.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Pack a nibble path (optionally ending in [`TERMINATOR`]) into bytes.
pub fn compact_encode(nibbles: &[u8]) -> Vec<u8> {
    let (path, leaf) = match nibbles.split_last() {
        Some((&TERMINATOR, rest)) => (rest, true),
        _ => (nibbles, false),
    };
    let odd = path.len() % 2 == 1;
    let flag = 2 * u8::from(leaf) + u8::from(odd);

    let mut padded = Vec::with_capacity(path.len() + 2);
    padded.push(flag);
    if !odd {
        padded.push(0);
    }
    padded.extend_from_slice(path);

    padded
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect()
}

/// Inverse of [`compact_encode`]; leaf prefixes get their [`TERMINATOR`] back.
pub fn compact_decode(encoded: &[u8]) -> Result<Vec<u8>, TrieError> {
    let Some(&first) = encoded.first() else {
        return Err(TrieError::Malformed("empty compact prefix".into()));
    };
    let flag = first >> 4;
    if flag > 3 {
        return Err(TrieError::Malformed(format!("bad prefix flag {flag}")));
    }
    let leaf = flag >= 2;
    let odd = flag % 2 == 1;
    if !odd && first & 0x0F != 0 {
        return Err(TrieError::Malformed("nonzero pad nibble".into()));
    }

    let mut nibbles = Vec::with_capacity(encoded.len() * 2);
    if odd {
        nibbles.push(first & 0x0F);
    }
    for byte in &encoded[1..] {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    if leaf {
        nibbles.push(TERMINATOR);
    }
    Ok(nibbles)
}

/// Whether a compact prefix is flagged as a leaf.
pub fn is_leaf_prefix(encoded: &[u8]) -> bool {
    encoded.first().is_some_and(|b| b >> 4 >= 2)
}
