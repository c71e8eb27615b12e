use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("hash mismatch on transaction {tx_hash}")]
    HashMismatch { tx_hash: String },

    #[error("transaction {tx_hash} is unsigned")]
    Unsigned { tx_hash: String },

    #[error("invalid signature on transaction {tx_hash}")]
    InvalidSignature { tx_hash: String },

    #[error("sender is not a valid public key: {0}")]
    InvalidSender(String),
}

impl From<serde_json::Error> for TransactionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
