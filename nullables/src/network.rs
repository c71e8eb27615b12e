//! Nullable peer network: record heartbeats, serve canned blocks and chains.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use merit_network::{HeartBeatData, NetworkError, PeerClient};
use merit_types::BlockHash;
use parking_lot::Mutex;

/// A [`PeerClient`] that never touches the network.
#[derive(Debug, Default)]
pub struct NullPeerClient {
    /// Every heartbeat "sent", with its target.
    sent: Mutex<Vec<(String, HeartBeatData)>>,
    /// Blocks each peer will answer `fetch_block` with.
    blocks: Mutex<HashMap<(String, u64, BlockHash), String>>,
    /// Chains each peer will answer `download_chain` with.
    chains: Mutex<HashMap<String, String>>,
    unreachable: Mutex<HashSet<String>>,
    block_requests: Mutex<Vec<(String, u64, BlockHash)>>,
}

impl NullPeerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `peer` answer `fetch_block(height, hash)` with `json`.
    pub fn serve_block(&self, peer: &str, height: u64, hash: BlockHash, json: impl Into<String>) {
        self.blocks
            .lock()
            .insert((peer.to_string(), height, hash), json.into());
    }

    /// Make `peer` answer `download_chain` with `json`.
    pub fn serve_chain(&self, peer: &str, json: impl Into<String>) {
        self.chains.lock().insert(peer.to_string(), json.into());
    }

    /// Every call to `peer` fails as if it timed out.
    pub fn set_unreachable(&self, peer: &str) {
        self.unreachable.lock().insert(peer.to_string());
    }

    /// All heartbeats "sent" so far.
    pub fn sent(&self) -> Vec<(String, HeartBeatData)> {
        self.sent.lock().clone()
    }

    /// Heartbeats "sent" to one peer.
    pub fn sent_to(&self, peer: &str) -> Vec<HeartBeatData> {
        self.sent
            .lock()
            .iter()
            .filter(|(p, _)| p == peer)
            .map(|(_, hb)| hb.clone())
            .collect()
    }

    /// Every `fetch_block` call, in order, including failed ones.
    pub fn block_requests(&self) -> Vec<(String, u64, BlockHash)> {
        self.block_requests.lock().clone()
    }

    /// Forget recorded traffic; canned answers stay.
    pub fn reset(&self) {
        self.sent.lock().clear();
        self.block_requests.lock().clear();
    }

    fn check_reachable(&self, peer: &str) -> Result<(), NetworkError> {
        if self.unreachable.lock().contains(peer) {
            Err(NetworkError::Timeout {
                peer: peer.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PeerClient for NullPeerClient {
    async fn send_heartbeat(
        &self,
        peer: &str,
        heartbeat: &HeartBeatData,
    ) -> Result<(), NetworkError> {
        self.check_reachable(peer)?;
        self.sent.lock().push((peer.to_string(), heartbeat.clone()));
        Ok(())
    }

    async fn fetch_block(
        &self,
        peer: &str,
        height: u64,
        hash: &BlockHash,
    ) -> Result<String, NetworkError> {
        self.block_requests
            .lock()
            .push((peer.to_string(), height, *hash));
        self.check_reachable(peer)?;
        self.blocks
            .lock()
            .get(&(peer.to_string(), height, *hash))
            .cloned()
            .ok_or_else(|| NetworkError::BlockNotFound {
                height,
                hash: hash.to_hex(),
            })
    }

    async fn download_chain(
        &self,
        peer: &str,
        heartbeat: &HeartBeatData,
    ) -> Result<String, NetworkError> {
        self.check_reachable(peer)?;
        self.sent.lock().push((peer.to_string(), heartbeat.clone()));
        self.chains
            .lock()
            .get(peer)
            .cloned()
            .ok_or_else(|| NetworkError::Status {
                peer: peer.to_string(),
                status: 404,
            })
    }
}
