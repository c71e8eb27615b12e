use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] merit_ledger::LedgerError),

    #[error("network error: {0}")]
    Network(#[from] merit_network::NetworkError),

    #[error("trie error: {0}")]
    Trie(#[from] merit_trie::TrieError),

    #[error("transaction error: {0}")]
    Transaction(#[from] merit_transactions::TransactionError),

    #[error("rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("work error: {0}")]
    Work(#[from] merit_work::WorkError),

    #[error("transaction {tx_hash} is already queued")]
    DuplicateTransaction { tx_hash: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("bootstrap from {peer} failed: {reason}")]
    Bootstrap { peer: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl NodeError {
    /// Whether the error is the caller's fault (bad input) rather than ours.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Transaction(_)
                | Self::Validation(_)
                | Self::DuplicateTransaction { .. }
                | Self::Ledger(merit_ledger::LedgerError::Malformed(_))
                | Self::Ledger(merit_ledger::LedgerError::HashMismatch { .. })
        )
    }
}
