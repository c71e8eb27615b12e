//! Mining loop: pull top-fee transactions, search a nonce, seal, flood.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use merit_ledger::Block;
use merit_network::HeartBeatData;
use merit_transactions::Transaction;
use merit_trie::Trie;
use merit_types::{BlockHash, Timestamp};
use merit_work::WorkError;

use crate::error::NodeError;
use crate::node::MeritNode;

/// A block being mined: its transactions, their trie and the parent it
/// extends.
struct Candidate {
    txs: Vec<Transaction>,
    trie: Trie,
    parent_hash: BlockHash,
    height: u64,
    /// Chain length when the candidate was built.
    observed_len: u64,
}

/// Trie of `tx hash -> serialized transaction`.
pub fn build_trie(txs: &[Transaction]) -> Result<Trie, NodeError> {
    let mut trie = Trie::new();
    for tx in txs {
        trie.insert(tx.hash.to_hex(), tx.to_json()?)?;
    }
    Ok(trie)
}

impl MeritNode {
    pub(crate) async fn mining_loop(self: Arc<Self>) {
        let idle = self.config().idle_wait();
        loop {
            match self.mine_block().await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!("admission queue empty, waiting for transactions");
                    self.queue.wait_for_transactions(idle).await;
                }
                Err(e) => {
                    error!(error = %e, "mining round failed");
                    tokio::time::sleep(idle).await;
                }
            }
        }
    }

    /// Mine one block from the queue.
    ///
    /// Returns `None` when the queue has nothing fresh to mine. If the chain
    /// grows while searching, the candidate's transactions go back to the
    /// queue and a new candidate is built on the new tip.
    pub async fn mine_block(&self) -> Result<Option<Arc<Block>>, NodeError> {
        let Some(mut candidate) = self.build_candidate().await? else {
            return Ok(None);
        };

        loop {
            if self.chain.len() != candidate.observed_len {
                debug!(
                    height = candidate.height,
                    "chain advanced while mining, rebuilding candidate"
                );
                self.queue
                    .release(candidate.txs, |h| self.chain.contains_transaction(h))
                    .await;
                match self.build_candidate().await? {
                    Some(next) => candidate = next,
                    None => return Ok(None),
                }
                continue;
            }

            match self.search_nonce(&candidate).await {
                Ok(Some(nonce)) => return Ok(Some(self.seal(candidate, nonce).await)),
                Ok(None) => continue,
                Err(e) => {
                    self.queue
                        .release(candidate.txs, |h| self.chain.contains_transaction(h))
                        .await;
                    return Err(e);
                }
            }
        }
    }

    async fn build_candidate(&self) -> Result<Option<Candidate>, NodeError> {
        let observed_len = self.chain.len();
        let (parent_hash, parent_height) = self
            .chain
            .tip()
            .map_or((BlockHash::ZERO, 0), |b| (*b.hash(), b.height()));

        let txs = self
            .queue
            .pull(self.validator.block_tx_limit(), |h| {
                self.chain.contains_transaction(h)
            })
            .await;
        self.metrics.queue_depth.set(self.queue.len().await as i64);
        if txs.is_empty() {
            return Ok(None);
        }

        let trie = match build_trie(&txs) {
            Ok(trie) => trie,
            Err(e) => {
                self.queue
                    .release(txs, |h| self.chain.contains_transaction(h))
                    .await;
                return Err(e);
            }
        };
        debug!(txs = txs.len(), height = parent_height + 1, "building block");
        Ok(Some(Candidate {
            txs,
            trie,
            parent_hash,
            height: parent_height + 1,
            observed_len,
        }))
    }

    /// One round of nonce search on the blocking pool. `None` when the round
    /// found nothing.
    async fn search_nonce(&self, candidate: &Candidate) -> Result<Option<String>, NodeError> {
        let generator = self.generator;
        let difficulty = self.validator.difficulty().clone();
        let parent = candidate.parent_hash;
        let root = candidate.trie.root_hash();

        let found = tokio::task::spawn_blocking(move || {
            generator.generate(&parent, &root, &difficulty)
        })
        .await
        .map_err(|e| NodeError::Internal(format!("nonce search aborted: {e}")))?;

        match found {
            Ok(nonce) => Ok(Some(nonce)),
            Err(WorkError::Exhausted { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn seal(&self, candidate: Candidate, nonce: String) -> Arc<Block> {
        let block = Arc::new(Block::seal(
            candidate.height,
            Timestamp::now(),
            candidate.parent_hash,
            nonce,
            self.producer(),
            candidate.trie,
        ));
        self.chain.insert(Arc::clone(&block));
        self.metrics.blocks_mined.inc();
        self.metrics.chain_length.set(self.chain.len() as i64);
        info!(
            hash = %block.hash(),
            height = block.height(),
            txs = block.entry_count(),
            "block mined"
        );

        match block.to_json() {
            Ok(json) => {
                let hb = HeartBeatData::new(self.config().node_id, self.self_addr(), String::new())
                    .with_block(json)
                    .with_hops(self.config().gossip_hops);
                let result = self.forward(&hb).await;
                debug!(sent = result.sent, failed = result.failed, "block flooded");
            }
            Err(e) => warn!(error = %e, "mined block not serializable, not flooded"),
        }
        block
    }
}
