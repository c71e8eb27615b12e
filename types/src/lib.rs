//! Fundamental types for the merit ledger.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: content hashes, Ed25519 key material, and timestamps.

pub mod error;
pub mod hash;
pub mod keys;
pub mod time;

pub use error::TypesError;
pub use hash::{BlockHash, NodeHash, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;
