//! Block proof-of-work.
//!
//! A block is sealed by finding a nonce such that
//! `SHA3-256(parent_hash_hex ++ nonce ++ trie_root_hex)`, hex encoded,
//! starts with the configured run of zero digits.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod validator;

pub use difficulty::Difficulty;
pub use error::WorkError;
pub use generator::{random_nonce, WorkGenerator};
pub use validator::{pow_hash, validate_work};
