use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed key encoding: {0}")]
    MalformedKey(String),

    #[error("not a valid Ed25519 point")]
    InvalidPoint,

    #[error("signature does not verify")]
    BadSignature,
}
