//! Sealed blocks and their JSON form.

use merit_crypto::sha3_256;
use merit_transactions::Transaction;
use merit_trie::Trie;
use merit_types::{BlockHash, NodeHash, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LedgerError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Heights start at 1.
    pub height: u64,
    pub timestamp: Timestamp,
    /// `BlockHash::ZERO` for a genesis block.
    pub parent_hash: BlockHash,
    pub hash: BlockHash,
    pub nonce: String,
    /// Encoded public key of the miner.
    pub producer: String,
    /// Byte length of the JSON form of the payload mapping.
    pub size: u64,
    pub root: NodeHash,
}

/// A sealed block: header plus its transaction trie
/// (transaction hash -> serialized transaction).
///
/// Immutable once sealed.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "BlockJson")]
pub struct Block {
    pub header: BlockHeader,
    pub trie: Trie,
}

/// Wire form of a block. `value` is the trie's flat mapping, not its node
/// graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockJson {
    pub nonce: String,
    pub height: u64,
    pub timestamp: Timestamp,
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
    pub size: u64,
    pub producer: String,
    pub value: BTreeMap<String, String>,
}

impl Block {
    /// Seal a block over `trie`, computing its size and hash.
    pub fn seal(
        height: u64,
        timestamp: Timestamp,
        parent_hash: BlockHash,
        nonce: impl Into<String>,
        producer: impl Into<String>,
        trie: Trie,
    ) -> Self {
        let size = payload_size(trie.mapping());
        let root = trie.root_hash();
        let hash = compute_hash(height, timestamp, &parent_hash, &root, size);
        Self {
            header: BlockHeader {
                height,
                timestamp,
                parent_hash,
                hash,
                nonce: nonce.into(),
                producer: producer.into(),
                size,
                root,
            },
            trie,
        }
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn hash(&self) -> &BlockHash {
        &self.header.hash
    }

    pub fn parent_hash(&self) -> &BlockHash {
        &self.header.parent_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.header.height == 1 && self.header.parent_hash.is_zero()
    }

    /// Number of payload entries.
    pub fn entry_count(&self) -> usize {
        self.trie.len()
    }

    /// Decode every payload entry, requiring each to be a transaction
    /// stored under its own hash.
    pub fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        let mut txs = Vec::with_capacity(self.entry_count());
        for (key, json) in self.trie.mapping() {
            let tx = Transaction::from_json(json).map_err(|e| LedgerError::MalformedEntry {
                block_hash: self.hash().to_hex(),
                key: key.clone(),
                reason: e.to_string(),
            })?;
            if tx.hash.to_hex() != *key {
                return Err(LedgerError::MisplacedEntry {
                    block_hash: self.hash().to_hex(),
                    key: key.clone(),
                    tx_hash: tx.hash.to_hex(),
                });
            }
            txs.push(tx);
        }
        Ok(txs)
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let raw: BlockJson = serde_json::from_str(json)?;
        Block::try_from(raw)
    }
}

/// SHA3-256 over decimal height, decimal timestamp, parent hex, root hex
/// and decimal size, concatenated.
pub fn compute_hash(
    height: u64,
    timestamp: Timestamp,
    parent_hash: &BlockHash,
    root: &NodeHash,
    size: u64,
) -> BlockHash {
    let preimage = format!("{height}{timestamp}{parent_hash}{root}{size}");
    BlockHash::new(sha3_256(preimage.as_bytes()))
}

fn payload_size(mapping: &BTreeMap<String, String>) -> u64 {
    // A map of strings always serializes.
    serde_json::to_vec(mapping).map_or(0, |v| v.len() as u64)
}

impl From<&Block> for BlockJson {
    fn from(block: &Block) -> Self {
        let h = &block.header;
        Self {
            nonce: h.nonce.clone(),
            height: h.height,
            timestamp: h.timestamp,
            hash: h.hash,
            parent_hash: h.parent_hash,
            size: h.size,
            producer: h.producer.clone(),
            value: block.trie.mapping().clone(),
        }
    }
}

impl Serialize for Block {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BlockJson::from(self).serialize(serializer)
    }
}

impl TryFrom<BlockJson> for Block {
    type Error = LedgerError;

    /// Rebuild the trie from the flat mapping and check the declared hash.
    fn try_from(json: BlockJson) -> Result<Self, Self::Error> {
        if json.height == 0 {
            return Err(LedgerError::Malformed("block height 0".into()));
        }
        let trie = Trie::from_mapping(json.value)?;
        let block = Block::seal(
            json.height,
            json.timestamp,
            json.parent_hash,
            json.nonce,
            json.producer,
            trie,
        );
        if block.header.size != json.size || block.header.hash != json.hash {
            return Err(LedgerError::HashMismatch {
                declared: json.hash.to_hex(),
                computed: block.header.hash.to_hex(),
            });
        }
        Ok(block)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
    }
}

impl Eq for Block {}
