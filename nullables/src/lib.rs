//! Nullable infrastructure for deterministic testing.
//!
//! The node reaches its peers only through [`merit_network::PeerClient`].
//! This crate provides an in-memory implementation that:
//! - records every outbound heartbeat
//! - serves blocks and chains from tables the test fills in
//! - can mark peers unreachable
//!
//! Usage: hand a [`NullPeerClient`] to the node instead of the HTTP client.

pub mod network;

pub use network::NullPeerClient;
