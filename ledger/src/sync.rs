//! Thread-safe chain facade.
//!
//! One exclusive lock guards the whole chain and is held for the full
//! duration of each call, so multi-step reads such as canonical derivation
//! observe a single snapshot. Callers never get a guard back and never hold
//! the lock across I/O.

use merit_transactions::Transaction;
use merit_types::{BlockHash, TxHash};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::block::Block;
use crate::chain::BlockChain;
use crate::error::LedgerError;

#[derive(Debug, Default)]
pub struct SyncBlockChain {
    inner: Mutex<BlockChain>,
}

impl SyncBlockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chain(chain: BlockChain) -> Self {
        Self {
            inner: Mutex::new(chain),
        }
    }

    pub fn insert(&self, block: impl Into<Arc<Block>>) -> bool {
        let block = block.into();
        let (height, hash) = (block.height(), *block.hash());
        let added = self.inner.lock().insert(block);
        if added {
            debug!(height, hash = %hash, "block inserted");
        }
        added
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.inner.lock().block_count()
    }

    pub fn get(&self, height: u64) -> Vec<Arc<Block>> {
        self.inner.lock().get(height).to_vec()
    }

    pub fn get_block(&self, height: u64, hash: &BlockHash) -> Option<Arc<Block>> {
        self.inner.lock().get_block(height, hash)
    }

    pub fn latest_blocks(&self) -> Vec<Arc<Block>> {
        self.inner.lock().latest_blocks().to_vec()
    }

    pub fn tip(&self) -> Option<Arc<Block>> {
        self.inner.lock().tip()
    }

    pub fn get_parent(&self, block: &Block) -> Result<Arc<Block>, LedgerError> {
        self.inner.lock().get_parent(block)
    }

    pub fn check_parent_hash(&self, block: &Block) -> bool {
        self.inner.lock().check_parent_hash(block)
    }

    pub fn canonical(&self, lookback: usize) -> Vec<Arc<Block>> {
        self.inner.lock().canonical(lookback)
    }

    pub fn canonical_from(&self, block: Arc<Block>) -> Vec<Arc<Block>> {
        self.inner.lock().canonical_from(block)
    }

    pub fn canonicals(&self) -> Vec<Vec<Arc<Block>>> {
        self.inner.lock().canonicals()
    }

    pub fn contains_transaction(&self, tx_hash: &TxHash) -> bool {
        self.inner.lock().contains_transaction(tx_hash)
    }

    pub fn contains_block(&self, height: u64, hash: &BlockHash) -> bool {
        self.inner.lock().contains_block(height, hash)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.inner.lock().transactions()
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        self.inner.lock().to_json()
    }

    /// Merge a downloaded chain into the local one.
    ///
    /// Decoding happens before the lock is taken. Every payload entry must be
    /// a transaction stored under its own hash; a malformed download leaves
    /// the chain untouched.
    pub fn update_entire_chain(&self, json: &str) -> Result<usize, LedgerError> {
        let incoming = BlockChain::from_json(json)?;
        for height in 1..=incoming.len() {
            for block in incoming.get(height) {
                block.transactions()?;
            }
        }
        let mut chain = self.inner.lock();
        let mut added = 0;
        for height in 1..=incoming.len() {
            for block in incoming.get(height) {
                if chain.insert(Arc::clone(block)) {
                    added += 1;
                }
            }
        }
        debug!(added, length = chain.len(), "chain merged");
        Ok(added)
    }

    pub fn show(&self) -> String {
        self.inner.lock().show()
    }
}
