use merit_transactions::TransactionError;
use merit_trie::TrieError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("parent {hash} of a block at height {child_height} not found")]
    ParentNotFound { child_height: u64, hash: String },

    #[error("malformed block data: {0}")]
    Malformed(String),

    #[error("block hash mismatch: declared {declared}, computed {computed}")]
    HashMismatch { declared: String, computed: String },

    #[error("block {block_hash} payload entry {key} is not a transaction: {reason}")]
    MalformedEntry {
        block_hash: String,
        key: String,
        reason: String,
    },

    #[error("block {block_hash} stores transaction {tx_hash} under key {key}")]
    MisplacedEntry {
        block_hash: String,
        key: String,
        tx_hash: String,
    },

    #[error("trie error: {0}")]
    Trie(#[from] TrieError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
