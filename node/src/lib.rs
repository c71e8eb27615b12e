//! Merit full node: orchestrates the ledger engines.
//!
//! The node is the central coordinator that:
//! - Admits validated transactions into a fee-priority queue
//! - Mines blocks from the queue with a multi-threaded nonce search
//! - Floods blocks, transactions and heartbeats to its peers
//! - Backfills missing ancestors of gossiped blocks
//! - Serves read-only projections over the canonical chain

pub mod admission_queue;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod mining;
pub mod node;
pub mod projections;
pub mod validation;

pub use admission_queue::AdmissionQueue;
pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use mining::build_trie;
pub use node::{HeartbeatOutcome, MeritNode, NodeState, StartOutcome};
pub use validation::{History, ValidationError, Validator};
