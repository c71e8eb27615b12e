//! Cryptographic primitives for the merit ledger.
//!
//! - **Ed25519** for signing transactions and identifying senders/producers
//! - **SHA3-256** for trie nodes, block hashes and proof-of-work
//! - **SHA-256** for transaction content hashes

pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use error::CryptoError;
pub use hash::{sha256, sha3_256, sha3_256_hex, sha3_256_multi};
pub use keys::{decode_public_key, generate_keypair, keypair_from_seed};
pub use sign::{sign_digest, verify_digest, verify_encoded};
