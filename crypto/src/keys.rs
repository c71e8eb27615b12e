//! Ed25519 miner and sender identities.
//!
//! A key travels as the lower-case hex of its 32 public bytes; that string is
//! both a transaction's `from` and a block's `producer`.

use ed25519_dalek::{SigningKey, VerifyingKey};
use merit_types::{KeyPair, PrivateKey, PublicKey};
use rand::rngs::OsRng;

use crate::error::CryptoError;

fn keypair(signing_key: &SigningKey) -> KeyPair {
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Fresh identity from the OS random source.
pub fn generate_keypair() -> KeyPair {
    keypair(&SigningKey::generate(&mut OsRng))
}

/// Deterministic identity, for fixtures and reproducible nodes.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair(&SigningKey::from_bytes(seed))
}

/// Decode a sender identity string, rejecting strings that are not hex,
/// have the wrong length, or do not name a curve point.
pub fn decode_public_key(encoded: &str) -> Result<PublicKey, CryptoError> {
    let key = PublicKey::decode(encoded).map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    VerifyingKey::from_bytes(&key.0).map_err(|_| CryptoError::InvalidPoint)?;
    Ok(key)
}
