//! Read-only views over canonical history.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::debug;

use merit_transactions::{SignedMerit, Transaction};

use crate::error::NodeError;
use crate::node::MeritNode;

impl MeritNode {
    /// Every transaction on the canonical chain, oldest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.chain.transactions()
    }

    /// Merit payloads of every canonical application.
    pub fn merits(&self) -> Vec<SignedMerit> {
        self.transactions()
            .iter()
            .filter_map(|tx| {
                let merit = tx.signed_merit();
                if merit.is_none() && tx.tx_type == merit_transactions::TxType::Application {
                    debug!(tx = %tx.hash, "application payload is not a merit");
                }
                merit
            })
            .collect()
    }

    /// Fees earned per producer along the canonical chain. Entries that do
    /// not decode earn nothing.
    pub fn balances(&self) -> BTreeMap<String, u64> {
        let mut balances = BTreeMap::new();
        for block in self.chain.canonical(0) {
            let earned = block
                .trie
                .mapping()
                .values()
                .filter_map(|json| Transaction::from_json(json).ok())
                .fold(0u64, |sum, tx| sum.saturating_add(tx.fee));
            let entry = balances.entry(block.header.producer.clone()).or_insert(0u64);
            *entry = entry.saturating_add(earned);
        }
        balances
    }

    /// Every fork head's ancestor chain, head first.
    pub fn canonical_dump(&self) -> Result<String, NodeError> {
        let mut out = String::new();
        for (i, chain) in self.chain.canonicals().iter().enumerate() {
            let _ = write!(out, "Chain #{i}: \n\n");
            for block in chain {
                let _ = write!(out, "Height: {}, block: {}\n\n", block.height(), block.to_json()?);
            }
            out.push_str("\n\n");
        }
        Ok(out)
    }

    /// Peer directory followed by the chain listing.
    pub fn show(&self) -> String {
        format!("{}\n{}", self.peers.show(), self.chain.show())
    }
}
