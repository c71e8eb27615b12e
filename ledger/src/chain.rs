//! Height-indexed block store with canonical-chain derivation.

use merit_crypto::sha3_256_hex;
use merit_transactions::Transaction;
use merit_types::{BlockHash, TxHash};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

use crate::block::{Block, BlockJson};
use crate::error::LedgerError;

/// Every block ever accepted, grouped by height.
///
/// More than one block at a height is an active fork. `length` is the
/// highest height ever inserted and never decreases.
#[derive(Clone, Debug, Default)]
pub struct BlockChain {
    chain: HashMap<u64, Vec<Arc<Block>>>,
    length: u64,
}

impl BlockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block. Returns `false` if a block with the same hash already
    /// sits at that height.
    pub fn insert(&mut self, block: impl Into<Arc<Block>>) -> bool {
        let block = block.into();
        let height = block.height();
        let blocks = self.chain.entry(height).or_default();
        if blocks.iter().any(|b| b.hash() == block.hash()) {
            return false;
        }
        blocks.push(block);
        self.length = self.length.max(height);
        true
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Total number of stored blocks across all forks.
    pub fn block_count(&self) -> usize {
        self.chain.values().map(Vec::len).sum()
    }

    pub fn get(&self, height: u64) -> &[Arc<Block>] {
        self.chain.get(&height).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn get_block(&self, height: u64, hash: &BlockHash) -> Option<Arc<Block>> {
        self.get(height).iter().find(|b| b.hash() == hash).cloned()
    }

    /// Every block at the current length (one per active fork head).
    pub fn latest_blocks(&self) -> &[Arc<Block>] {
        self.get(self.length)
    }

    /// The block new mining builds on: the first block stored at the current
    /// length.
    pub fn tip(&self) -> Option<Arc<Block>> {
        self.latest_blocks().first().cloned()
    }

    pub fn get_parent(&self, block: &Block) -> Result<Arc<Block>, LedgerError> {
        block
            .height()
            .checked_sub(1)
            .and_then(|h| self.get_block(h, block.parent_hash()))
            .ok_or_else(|| LedgerError::ParentNotFound {
                child_height: block.height(),
                hash: block.parent_hash().to_hex(),
            })
    }

    /// Whether the block's parent is known locally. Genesis blocks need no
    /// parent.
    pub fn check_parent_hash(&self, block: &Block) -> bool {
        block.is_genesis() || self.get_parent(block).is_ok()
    }

    // ── Canonical selection ─────────────────────────────────────────────────

    /// The authoritative chain, head first.
    ///
    /// Steps down from the tip past every height that does not hold exactly
    /// one block, then back `lookback` more parents (stopping early at a gap
    /// or genesis), then follows parents to genesis.
    pub fn canonical(&self, lookback: usize) -> Vec<Arc<Block>> {
        let mut height = self.length;
        while height > 0 && self.get(height).len() != 1 {
            height -= 1;
        }
        let Some(mut head) = self.get(height).first().cloned() else {
            return Vec::new();
        };
        for _ in 0..lookback {
            match self.get_parent(&head) {
                Ok(parent) => head = parent,
                Err(_) => break,
            }
        }
        self.canonical_from(head)
    }

    /// `block` followed by every ancestor reachable through parent links.
    pub fn canonical_from(&self, block: Arc<Block>) -> Vec<Arc<Block>> {
        let mut chain = vec![block];
        while let Some(last) = chain.last() {
            match self.get_parent(last) {
                Ok(parent) => chain.push(parent),
                Err(_) => break,
            }
        }
        chain
    }

    /// One ancestor chain per fork head at the current length.
    pub fn canonicals(&self) -> Vec<Vec<Arc<Block>>> {
        self.latest_blocks()
            .iter()
            .map(|b| self.canonical_from(Arc::clone(b)))
            .collect()
    }

    /// Whether any fork head's ancestor chain carries this transaction.
    pub fn contains_transaction(&self, tx_hash: &TxHash) -> bool {
        let key = tx_hash.to_hex();
        self.canonicals()
            .iter()
            .flatten()
            .any(|b| b.trie.mapping().contains_key(&key))
    }

    /// Whether any fork head's ancestor chain holds this block.
    pub fn contains_block(&self, height: u64, hash: &BlockHash) -> bool {
        self.canonicals()
            .iter()
            .flatten()
            .any(|b| b.height() == height && b.hash() == hash)
    }

    /// Every transaction on `canonical(0)`, oldest block first.
    ///
    /// An entry that does not decode is logged and skipped.
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut txs = Vec::new();
        for block in self.canonical(0).iter().rev() {
            for (key, json) in block.trie.mapping() {
                match Transaction::from_json(json) {
                    Ok(tx) => txs.push(tx),
                    Err(e) => {
                        warn!(block = %block.hash(), key = %key, error = %e, "skipping undecodable entry")
                    }
                }
            }
        }
        txs
    }

    // ── Serialization ───────────────────────────────────────────────────────

    /// Height-ascending JSON list of every stored block.
    pub fn to_json(&self) -> Result<String, LedgerError> {
        let blocks: Vec<&Block> = (1..=self.length)
            .flat_map(|h| self.get(h).iter().map(Arc::as_ref))
            .collect();
        Ok(serde_json::to_string(&blocks)?)
    }

    /// Insert every block of a serialized chain. Returns how many were new.
    pub fn merge_json(&mut self, json: &str) -> Result<usize, LedgerError> {
        let raw: Vec<BlockJson> = serde_json::from_str(json)?;
        let mut blocks = Vec::with_capacity(raw.len());
        for b in raw {
            blocks.push(Block::try_from(b)?);
        }
        let mut added = 0;
        for block in blocks {
            if self.insert(block) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let mut chain = Self::new();
        chain.merge_json(json)?;
        Ok(chain)
    }

    /// Per-height listing of `hash<=parent` pairs, headed by a digest of the
    /// listing.
    pub fn show(&self) -> String {
        let mut heights: Vec<_> = self.chain.keys().copied().collect();
        heights.sort_unstable();
        let mut body = String::new();
        for height in heights {
            let mut links: Vec<String> = self
                .get(height)
                .iter()
                .map(|b| format!("{}<={}", b.hash(), b.parent_hash()))
                .collect();
            links.sort();
            let _ = write!(body, "{height}: ");
            for link in links {
                let _ = write!(body, "{link}, ");
            }
            body.push('\n');
        }
        format!("This is the BlockChain: {}\n{body}", sha3_256_hex(body.as_bytes()))
    }
}
