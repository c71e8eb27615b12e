//! HTTP surface of a merit node.
//!
//! Provides endpoints for:
//! - Peer protocol: heartbeat gossip, full-chain handshake, block lookup
//! - Runtime activation
//! - Transaction submission
//! - Read-only views over the canonical chain
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer};
