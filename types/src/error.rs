//! Parse errors for the hex-encoded wire types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl From<hex::FromHexError> for TypesError {
    fn from(e: hex::FromHexError) -> Self {
        Self::InvalidHex(e.to_string())
    }
}

/// Decode a hex string into a fixed-size byte array.
pub(crate) fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypesError> {
    let bytes = hex::decode(s)?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| TypesError::InvalidLength { expected: N, actual })
}
