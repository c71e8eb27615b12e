//! Heartbeat gossip envelope.

use serde::{Deserialize, Serialize};

/// Flood budget attached to freshly produced gossip.
pub const DEFAULT_HOPS: i32 = 2;

/// The message every node pushes to its peers.
///
/// A plain heartbeat only advertises the sender and its peer directory; the
/// `if_new_*` flags mark a piggy-backed block or transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartBeatData {
    pub if_new_block: bool,
    #[serde(default)]
    pub if_new_transaction: bool,
    pub id: i32,
    #[serde(default)]
    pub block_json: String,
    #[serde(default)]
    pub transaction_json: String,
    #[serde(default)]
    pub peer_map_json: String,
    pub addr: String,
    #[serde(default)]
    pub hops: i32,
}

impl HeartBeatData {
    /// A heartbeat carrying no block or transaction.
    pub fn new(id: i32, addr: impl Into<String>, peer_map_json: impl Into<String>) -> Self {
        Self {
            if_new_block: false,
            if_new_transaction: false,
            id,
            block_json: String::new(),
            transaction_json: String::new(),
            peer_map_json: peer_map_json.into(),
            addr: addr.into(),
            hops: DEFAULT_HOPS,
        }
    }

    pub fn with_block(mut self, block_json: impl Into<String>) -> Self {
        self.if_new_block = true;
        self.block_json = block_json.into();
        self
    }

    pub fn with_transaction(mut self, transaction_json: impl Into<String>) -> Self {
        self.if_new_transaction = true;
        self.transaction_json = transaction_json.into();
        self
    }

    pub fn with_hops(mut self, hops: i32) -> Self {
        self.hops = hops;
        self
    }

    pub fn is_plain(&self) -> bool {
        !self.if_new_block && !self.if_new_transaction
    }

    /// The same message with one hop spent, or `None` once the budget is gone.
    pub fn forwarded(&self) -> Option<Self> {
        (self.hops > 0).then(|| Self {
            hops: self.hops - 1,
            ..self.clone()
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
