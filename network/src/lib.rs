//! Peer-to-peer plumbing for the merit node.
//!
//! Tracks the bounded peer directory, defines the heartbeat gossip envelope,
//! and abstracts outbound peer calls behind [`PeerClient`] so the runtime can
//! be driven by an HTTP client in production and an in-memory one in tests.

pub mod broadcast;
pub mod client;
pub mod error;
pub mod heartbeat;
pub mod peer_directory;

pub use broadcast::{flood, BroadcastResult};
pub use client::{HttpPeerClient, PeerClient};
pub use error::NetworkError;
pub use heartbeat::{HeartBeatData, DEFAULT_HOPS};
pub use peer_directory::PeerDirectory;
