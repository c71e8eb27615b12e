//! The merit node runtime: one context object owning the chain, the peer
//! directory and the admission queue, shared by the background loops and
//! every HTTP request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use merit_crypto::generate_keypair;
use merit_ledger::{Block, SyncBlockChain};
use merit_network::{flood, BroadcastResult, HeartBeatData, PeerClient, PeerDirectory};
use merit_transactions::Transaction;
use merit_types::{BlockHash, KeyPair, TxHash};
use merit_work::WorkGenerator;

use crate::admission_queue::AdmissionQueue;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::validation::{ValidationError, Validator};

// ── Lifecycle ──────────────────────────────────────────────────────────

/// One-way lifecycle: a node never leaves `Running`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    NotStarted,
    Running,
}

/// Result of a start request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// What became of an inbound heartbeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The node has not started yet.
    Ignored,
    /// Sender merged; the carried block or transaction (if any) was accepted.
    Accepted,
    /// The carried block or transaction failed validation.
    Rejected,
}

// ── Node ───────────────────────────────────────────────────────────────

pub struct MeritNode {
    config: NodeConfig,
    self_addr: String,
    /// Miner identity; its encoded public key is the block producer.
    keys: KeyPair,
    pub(crate) chain: SyncBlockChain,
    pub(crate) peers: PeerDirectory,
    pub(crate) queue: AdmissionQueue,
    client: Arc<dyn PeerClient>,
    pub(crate) validator: Validator,
    pub(crate) generator: WorkGenerator,
    pub(crate) metrics: NodeMetrics,
    /// Serializes start requests.
    state: Mutex<NodeState>,
    running: AtomicBool,
}

impl MeritNode {
    /// Build a node with a fresh miner key.
    pub fn new(config: NodeConfig, client: Arc<dyn PeerClient>) -> Result<Arc<Self>, NodeError> {
        Self::with_keys(config, client, generate_keypair())
    }

    pub fn with_keys(
        config: NodeConfig,
        client: Arc<dyn PeerClient>,
        keys: KeyPair,
    ) -> Result<Arc<Self>, NodeError> {
        config.validate()?;
        let metrics = NodeMetrics::new()?;
        Ok(Arc::new(Self {
            self_addr: config.self_addr(),
            peers: PeerDirectory::new(config.node_id, config.max_peers),
            validator: Validator::new(config.difficulty.clone(), config.block_tx_limit),
            generator: WorkGenerator::new(config.mining_batch),
            chain: SyncBlockChain::new(),
            queue: AdmissionQueue::new(),
            keys,
            client,
            metrics,
            state: Mutex::new(NodeState::NotStarted),
            running: AtomicBool::new(false),
            config,
        }))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn chain(&self) -> &SyncBlockChain {
        &self.chain
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Encoded public key stamped on every block this node mines.
    pub fn producer(&self) -> String {
        self.keys.public.encode()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn state(&self) -> NodeState {
        *self.state.lock().await
    }

    // ── Start ──────────────────────────────────────────────────────────

    /// Register in the peer directory, download the chain from the bootstrap
    /// peer if one is configured, then spawn the heartbeat loop and (unless
    /// disabled) the mining loop.
    ///
    /// Repeated calls are no-ops. A failed download leaves the node
    /// `NotStarted`.
    pub async fn start(self: &Arc<Self>) -> Result<StartOutcome, NodeError> {
        let mut state = self.state.lock().await;
        if *state == NodeState::Running {
            debug!("start requested while already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        self.peers.register(self.config.node_id);
        match &self.config.bootstrap_peer {
            Some(peer) => {
                let added = self.download(peer).await.map_err(|e| NodeError::Bootstrap {
                    peer: peer.clone(),
                    reason: e.to_string(),
                })?;
                info!(peer = %peer, blocks = added, "chain downloaded from bootstrap peer");
            }
            None => info!("no bootstrap peer configured, founding a new chain"),
        }

        *state = NodeState::Running;
        self.running.store(true, Ordering::Release);
        tokio::spawn(Arc::clone(self).heartbeat_loop());
        if self.config.enable_mining {
            tokio::spawn(Arc::clone(self).mining_loop());
        }

        info!(
            id = self.config.node_id,
            addr = %self.self_addr,
            difficulty = %self.config.difficulty,
            "node started"
        );
        Ok(StartOutcome::Started)
    }

    /// Full-chain handshake with `peer`. Returns how many blocks were new.
    pub async fn download(&self, peer: &str) -> Result<usize, NodeError> {
        let hb = self.heartbeat()?;
        let json = self.client.download_chain(peer, &hb).await?;
        let added = self.chain.update_entire_chain(&json)?;
        self.metrics.chain_length.set(self.chain.len() as i64);
        Ok(added)
    }

    // ── Heartbeats ─────────────────────────────────────────────────────

    /// A plain heartbeat advertising this node and its directory.
    pub fn heartbeat(&self) -> Result<HeartBeatData, NodeError> {
        Ok(
            HeartBeatData::new(self.config.node_id, self.self_addr.clone(), self.peers.to_json()?)
                .with_hops(self.config.gossip_hops),
        )
    }

    /// One heartbeat round: rebalance, then push to every known peer.
    pub async fn beat(&self) -> Result<BroadcastResult, NodeError> {
        self.peers.rebalance();
        let hb = self.heartbeat()?;
        let peers = self.peers.addresses();
        self.metrics.peer_count.set(peers.len() as i64);
        Ok(flood(self.client.as_ref(), &peers, &hb).await)
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let min = self.config.heartbeat_min_secs;
        let max = self.config.heartbeat_max_secs;
        loop {
            let secs = rand::thread_rng().gen_range(min..=max);
            tokio::time::sleep(Duration::from_secs(secs)).await;
            match self.beat().await {
                Ok(result) => debug!(sent = result.sent, failed = result.failed, "heartbeat"),
                Err(e) => warn!(error = %e, "heartbeat round failed"),
            }
        }
    }

    /// Re-send `hb` from this node with one hop spent.
    ///
    /// The directory is rebalanced first and the envelope is re-stamped with
    /// our id, address and directory.
    pub async fn forward(&self, hb: &HeartBeatData) -> BroadcastResult {
        let Some(mut out) = hb.forwarded() else {
            return BroadcastResult::default();
        };
        self.peers.rebalance();
        out.id = self.config.node_id;
        out.addr = self.self_addr.clone();
        out.peer_map_json = self.peers.to_json().unwrap_or_else(|e| {
            warn!(error = %e, "peer directory not serializable");
            String::new()
        });
        let peers = self.peers.addresses();
        flood(self.client.as_ref(), &peers, &out).await
    }

    /// Gossip ingestion.
    ///
    /// Merges the sender and its directory, ingests the carried block or
    /// transaction, and re-floods while hops remain. Rejected payloads are
    /// not re-flooded.
    pub async fn receive_heartbeat(&self, hb: HeartBeatData) -> HeartbeatOutcome {
        if !self.is_running() {
            return HeartbeatOutcome::Ignored;
        }

        if hb.addr != self.self_addr && !hb.addr.is_empty() {
            self.peers.add(hb.addr.clone(), hb.id);
        }
        if let Err(e) = self.peers.inject_json(&hb.peer_map_json, &self.self_addr) {
            debug!(peer = %hb.addr, error = %e, "ignoring malformed peer map");
        }
        self.metrics.peer_count.set(self.peers.len() as i64);

        let ingested = if hb.if_new_block {
            self.ingest_block(&hb.block_json).await.map(|_| ())
        } else if hb.if_new_transaction {
            self.admit_json(&hb.transaction_json).await.map(|_| ())
        } else {
            Ok(())
        };

        match ingested {
            Ok(()) => {
                if hb.hops > 0 {
                    self.forward(&hb).await;
                }
                HeartbeatOutcome::Accepted
            }
            Err(e) => {
                debug!(peer = %hb.addr, error = %e, "gossip payload rejected");
                HeartbeatOutcome::Rejected
            }
        }
    }

    // ── Blocks ─────────────────────────────────────────────────────────

    /// Decode, link, validate and insert a gossiped block.
    pub async fn ingest_block(&self, json: &str) -> Result<Arc<Block>, NodeError> {
        let block = Block::from_json(json)?;
        if !self.chain.check_parent_hash(&block) {
            let inserted = self
                .backfill(block.height().saturating_sub(1), *block.parent_hash())
                .await;
            debug!(hash = %block.hash(), inserted, "backfill finished");
        }

        if let Err(e) = self.validator.validate_block(&block, &self.chain) {
            if matches!(e, ValidationError::DuplicateBlock { .. }) {
                debug!(hash = %block.hash(), "block already known");
            } else {
                self.metrics.blocks_rejected.inc();
                warn!(hash = %block.hash(), height = block.height(), error = %e, "block rejected");
            }
            return Err(e.into());
        }

        let block = Arc::new(block);
        if self.chain.insert(Arc::clone(&block)) {
            self.metrics.blocks_accepted.inc();
            self.metrics.chain_length.set(self.chain.len() as i64);
            info!(hash = %block.hash(), height = block.height(), "block accepted");
        }
        Ok(block)
    }

    /// Fetch missing ancestors from peers, starting at (`height`, `hash`).
    ///
    /// Each ancestor is requested from every known peer in turn until one
    /// answers; the walk continues while the fetched block's own parent is
    /// unknown. The chain lock is never held across a peer call. Returns the
    /// number of blocks inserted.
    pub async fn backfill(&self, height: u64, hash: BlockHash) -> usize {
        let mut inserted = 0;
        let mut wanted = Some((height, hash));

        while let Some((height, hash)) = wanted.take() {
            if height == 0 || self.chain.get_block(height, &hash).is_some() {
                break;
            }
            self.metrics.backfill_requests.inc();

            let Some(block) = self.fetch_from_peers(height, &hash).await else {
                warn!(height, hash = %hash, "ancestor not available from any peer");
                break;
            };

            let parent_missing = !self.chain.check_parent_hash(&block);
            let (next_height, next_hash) = (block.height().saturating_sub(1), *block.parent_hash());
            if self.chain.insert(block) {
                inserted += 1;
                self.metrics.chain_length.set(self.chain.len() as i64);
            }
            if parent_missing {
                wanted = Some((next_height, next_hash));
            }
        }
        inserted
    }

    async fn fetch_from_peers(&self, height: u64, hash: &BlockHash) -> Option<Block> {
        for peer in self.peers.addresses() {
            let json = match self.client.fetch_block(&peer, height, hash).await {
                Ok(json) => json,
                Err(e) => {
                    debug!(peer = %peer, height, error = %e, "peer could not serve block");
                    continue;
                }
            };
            match Block::from_json(&json) {
                Ok(block) if block.hash() == hash && block.height() == height => {
                    if let Err(e) = self.validator.check_integrity(&block) {
                        debug!(peer = %peer, error = %e, "backfilled block rejected");
                        continue;
                    }
                    return Some(block);
                }
                Ok(block) => {
                    debug!(peer = %peer, got = %block.hash(), "peer answered with another block")
                }
                Err(e) => debug!(peer = %peer, error = %e, "peer answered with malformed block"),
            }
        }
        None
    }

    /// JSON of the block at (`height`, `hash`), if stored.
    pub fn block_json(&self, height: u64, hash: &BlockHash) -> Result<Option<String>, NodeError> {
        self.chain
            .get_block(height, hash)
            .map(|b| b.to_json())
            .transpose()
            .map_err(NodeError::from)
    }

    /// Full-chain handshake, server side: remember the caller and hand over
    /// the serialized chain.
    pub fn upload(&self, hb: &HeartBeatData) -> Result<String, NodeError> {
        if hb.addr != self.self_addr && !hb.addr.is_empty() {
            self.peers.add(hb.addr.clone(), hb.id);
            self.metrics.peer_count.set(self.peers.len() as i64);
        }
        Ok(self.chain.to_json()?)
    }

    // ── Transactions ───────────────────────────────────────────────────

    /// Decode and admit a serialized transaction.
    pub async fn admit_json(&self, json: &str) -> Result<TxHash, NodeError> {
        let admitted = match Transaction::from_json(json) {
            Ok(tx) => self.admit(tx).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &admitted {
            self.metrics.transactions_rejected.inc();
            debug!(error = %e, "transaction rejected");
        }
        admitted
    }

    /// Validate and queue a transaction. Duplicates of a queued transaction
    /// are refused before validation.
    pub async fn admit(&self, tx: Transaction) -> Result<TxHash, NodeError> {
        let tx_hash = tx.hash;
        if self.queue.contains(&tx_hash).await {
            return Err(NodeError::DuplicateTransaction {
                tx_hash: tx_hash.to_hex(),
            });
        }
        self.validator.validate_transaction(&tx, &self.chain)?;
        if !self.queue.push(tx).await {
            return Err(NodeError::DuplicateTransaction {
                tx_hash: tx_hash.to_hex(),
            });
        }
        self.metrics.transactions_admitted.inc();
        self.metrics.queue_depth.set(self.queue.len().await as i64);
        info!(tx = %tx_hash, "transaction admitted");
        Ok(tx_hash)
    }

    /// Direct submission: admit, then flood to every peer.
    pub async fn submit_transaction(&self, json: &str) -> Result<TxHash, NodeError> {
        let tx_hash = self.admit_json(json).await?;
        let hb = HeartBeatData::new(self.config.node_id, self.self_addr.clone(), String::new())
            .with_transaction(json)
            .with_hops(self.config.gossip_hops);
        let result = self.forward(&hb).await;
        debug!(tx = %tx_hash, sent = result.sent, failed = result.failed, "transaction flooded");
        Ok(tx_hash)
    }
}
