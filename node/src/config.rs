//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use merit_work::Difficulty;

use crate::NodeError;

/// Configuration for a merit node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Numeric id of this node; the centre of its peer ring.
    #[serde(default = "default_node_id")]
    pub node_id: i32,

    /// HTTP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address peers reach us at. Defaults to `http://localhost:<port>`.
    #[serde(default)]
    pub advertise_addr: Option<String>,

    /// Peer to download the chain from on start. `None` founds a new chain.
    #[serde(default)]
    pub bootstrap_peer: Option<String>,

    /// Required leading zero-hex prefix of the proof-of-work hash.
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Upper bound of the peer directory.
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,

    /// Most transactions a block may carry.
    #[serde(default = "default_block_tx_limit")]
    pub block_tx_limit: usize,

    /// Flood budget for freshly produced gossip.
    #[serde(default = "default_gossip_hops")]
    pub gossip_hops: i32,

    #[serde(default = "default_heartbeat_min_secs")]
    pub heartbeat_min_secs: u64,

    #[serde(default = "default_heartbeat_max_secs")]
    pub heartbeat_max_secs: u64,

    /// How long the miner waits for transactions before re-checking the queue.
    #[serde(default = "default_idle_wait_secs")]
    pub idle_wait_secs: u64,

    /// Timeout applied to every outbound peer request.
    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,

    /// Whether `start` spawns the mining loop.
    #[serde(default = "default_true")]
    pub enable_mining: bool,

    /// Nonces tried per search round before the miner re-checks the tip.
    #[serde(default = "default_mining_batch")]
    pub mining_batch: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_id() -> i32 {
    1
}

fn default_port() -> u16 {
    6686
}

fn default_max_peers() -> usize {
    32
}

fn default_block_tx_limit() -> usize {
    20
}

fn default_gossip_hops() -> i32 {
    merit_network::DEFAULT_HOPS
}

fn default_heartbeat_min_secs() -> u64 {
    5
}

fn default_heartbeat_max_secs() -> u64 {
    10
}

fn default_idle_wait_secs() -> u64 {
    7
}

fn default_peer_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_mining_batch() -> u64 {
    merit_work::generator::DEFAULT_BATCH
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.heartbeat_min_secs > self.heartbeat_max_secs {
            return Err(NodeError::Config(format!(
                "heartbeat_min_secs ({}) exceeds heartbeat_max_secs ({})",
                self.heartbeat_min_secs, self.heartbeat_max_secs
            )));
        }
        if self.block_tx_limit == 0 {
            return Err(NodeError::Config("block_tx_limit must be positive".into()));
        }
        if self.gossip_hops < 0 {
            return Err(NodeError::Config("gossip_hops must not be negative".into()));
        }
        Ok(())
    }

    /// The address this node announces in heartbeats.
    pub fn self_addr(&self) -> String {
        self.advertise_addr
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_secs(self.idle_wait_secs)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            port: default_port(),
            advertise_addr: None,
            bootstrap_peer: None,
            difficulty: Difficulty::default(),
            max_peers: default_max_peers(),
            block_tx_limit: default_block_tx_limit(),
            gossip_hops: default_gossip_hops(),
            heartbeat_min_secs: default_heartbeat_min_secs(),
            heartbeat_max_secs: default_heartbeat_max_secs(),
            idle_wait_secs: default_idle_wait_secs(),
            peer_timeout_ms: default_peer_timeout_ms(),
            enable_mining: default_true(),
            mining_batch: default_mining_batch(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
