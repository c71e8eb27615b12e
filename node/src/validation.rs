//! Transaction and block validation against the local chain.

use std::collections::HashSet;

use thiserror::Error;

use merit_ledger::{Block, LedgerError, SyncBlockChain};
use merit_transactions::{Transaction, TransactionError, TxType};
use merit_work::{validate_work, Difficulty};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid transaction format: {0}")]
    Format(#[from] TransactionError),

    #[error("transaction {tx_hash} is already in the chain")]
    AlreadyInChain { tx_hash: String },

    #[error("acceptance {tx_hash} references unknown merit {merit_hash}")]
    UnknownMerit { tx_hash: String, merit_hash: String },

    #[error("confirmation {tx_hash} references unknown transaction {target}")]
    UnknownTransaction { tx_hash: String, target: String },

    #[error("block {block_hash} does not meet difficulty {difficulty}")]
    InsufficientWork {
        block_hash: String,
        difficulty: String,
    },

    #[error("block {block_hash} carries {count} transactions (limit {limit})")]
    TooManyTransactions {
        block_hash: String,
        count: usize,
        limit: usize,
    },

    #[error("block {block_hash} at height {height} is already known")]
    DuplicateBlock { height: u64, block_hash: String },

    #[error("block {block_hash} rejected: {source}")]
    InvalidTransaction {
        block_hash: String,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("chain unreadable: {0}")]
    Ledger(#[from] LedgerError),
}

/// Identifiers a referencing transaction may point at, taken from one
/// snapshot of the canonical history.
#[derive(Debug, Default)]
pub struct History {
    tx_hashes: HashSet<String>,
    merit_hashes: HashSet<String>,
}

impl History {
    pub fn from_chain(chain: &SyncBlockChain) -> Self {
        Self::from_transactions(&chain.transactions())
    }

    pub fn from_transactions(txs: &[Transaction]) -> Self {
        let mut history = Self::default();
        for tx in txs {
            history.tx_hashes.insert(tx.hash.to_hex());
            if let Some(merit) = tx.signed_merit() {
                history.merit_hashes.insert(merit.hash);
            }
        }
        history
    }

    pub fn has_transaction(&self, hash: &str) -> bool {
        self.tx_hashes.contains(hash)
    }

    pub fn has_merit(&self, hash: &str) -> bool {
        self.merit_hashes.contains(hash)
    }
}

/// Stateless rules plus the chain lookups they need.
#[derive(Clone, Debug)]
pub struct Validator {
    difficulty: Difficulty,
    block_tx_limit: usize,
}

impl Validator {
    pub fn new(difficulty: Difficulty, block_tx_limit: usize) -> Self {
        Self {
            difficulty,
            block_tx_limit,
        }
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn block_tx_limit(&self) -> usize {
        self.block_tx_limit
    }

    pub fn validate_transaction(
        &self,
        tx: &Transaction,
        chain: &SyncBlockChain,
    ) -> Result<(), ValidationError> {
        let history = History::from_chain(chain);
        self.validate_transaction_with(tx, chain, &history)
    }

    /// Same as [`Self::validate_transaction`] against a prepared history.
    pub fn validate_transaction_with(
        &self,
        tx: &Transaction,
        chain: &SyncBlockChain,
        history: &History,
    ) -> Result<(), ValidationError> {
        tx.verify()?;

        let tx_hash = tx.hash.to_hex();
        if chain.contains_transaction(&tx.hash) {
            return Err(ValidationError::AlreadyInChain { tx_hash });
        }

        match tx.tx_type {
            TxType::Acceptance if !history.has_merit(&tx.to) => {
                Err(ValidationError::UnknownMerit {
                    tx_hash,
                    merit_hash: tx.to.clone(),
                })
            }
            TxType::Confirmation if !history.has_transaction(&tx.to) => {
                Err(ValidationError::UnknownTransaction {
                    tx_hash,
                    target: tx.to.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Proof-of-work check alone.
    pub fn check_work(&self, block: &Block) -> Result<(), ValidationError> {
        if validate_work(
            block.parent_hash(),
            &block.header.nonce,
            &block.header.root,
            &self.difficulty,
        ) {
            Ok(())
        } else {
            Err(ValidationError::InsufficientWork {
                block_hash: block.hash().to_hex(),
                difficulty: self.difficulty.to_string(),
            })
        }
    }

    /// Checks a block from a peer must pass before it is stored without
    /// transaction validation: proof of work, and every entry a transaction
    /// under its own hash.
    pub fn check_integrity(&self, block: &Block) -> Result<(), ValidationError> {
        self.check_work(block)?;
        block.transactions()?;
        Ok(())
    }

    /// Full check of a gossiped block. Any failure rejects the whole block.
    pub fn validate_block(
        &self,
        block: &Block,
        chain: &SyncBlockChain,
    ) -> Result<(), ValidationError> {
        self.check_work(block)?;

        let block_hash = block.hash().to_hex();
        let count = block.entry_count();
        if count > self.block_tx_limit {
            return Err(ValidationError::TooManyTransactions {
                block_hash,
                count,
                limit: self.block_tx_limit,
            });
        }

        if chain.contains_block(block.height(), block.hash()) {
            return Err(ValidationError::DuplicateBlock {
                height: block.height(),
                block_hash,
            });
        }

        let history = History::from_chain(chain);
        for tx in block.transactions()? {
            self.validate_transaction_with(&tx, chain, &history)
                .map_err(|e| ValidationError::InvalidTransaction {
                    block_hash: block_hash.clone(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}
