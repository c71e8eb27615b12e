//! Signer/Verifier over 32-byte payload digests.
//!
//! Transactions are signed over the raw bytes of their content hash, never
//! over the serialized transaction itself.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use merit_types::{PrivateKey, PublicKey, Signature};

use crate::error::CryptoError;
use crate::keys::decode_public_key;

/// Sign a payload digest.
pub fn sign_digest(private_key: &PrivateKey, digest: &[u8; 32]) -> Signature {
    Signature(SigningKey::from_bytes(&private_key.0).sign(digest).to_bytes())
}

/// Check `signature` over `digest` under `public_key`.
///
/// Strict verification: small-order keys and malleable signatures fail.
pub fn verify_digest(public_key: &PublicKey, digest: &[u8; 32], signature: &Signature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    key.verify_strict(digest, &ed25519_dalek::Signature::from_bytes(&signature.0))
        .is_ok()
}

/// Verify against a sender given in its encoded (hex) form.
pub fn verify_encoded(
    sender: &str,
    digest: &[u8; 32],
    signature: &Signature,
) -> Result<(), CryptoError> {
    let key = decode_public_key(sender)?;
    if verify_digest(&key, digest, signature) {
        Ok(())
    } else {
        Err(CryptoError::BadSignature)
    }
}
