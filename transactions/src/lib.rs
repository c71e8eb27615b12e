//! Merit transactions and their stateless checks.
//!
//! Transaction types:
//! - **Application**: an applicant publishes a [`SignedMerit`] payload
//! - **Acceptance**: an employer accepts an application, naming its merit hash in `to`
//! - **Confirmation**: the applicant confirms an existing transaction, naming its hash in `to`
//!
//! Stateful checks (referential rules, canonical-chain membership) live in the
//! node, which owns the chain.

pub mod error;
pub mod merit;

pub use error::TransactionError;
pub use merit::{Merit, SignedMerit};

use merit_crypto::{sha256, sign_digest, verify_encoded, CryptoError};
use merit_types::{KeyPair, PrivateKey, Signature, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Application,
    Acceptance,
    Confirmation,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Application => "application",
            Self::Acceptance => "acceptance",
            Self::Confirmation => "confirmation",
        })
    }
}

/// A signed ledger transaction. Immutable once hashed and signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    #[serde(rename = "txtype")]
    pub tx_type: TxType,
    #[serde(rename = "txfee")]
    pub fee: u64,
    pub timestamp: Timestamp,
    pub payload: String,
    pub hash: TxHash,
    #[serde(default)]
    pub signature: Option<Signature>,
}

/// The fields covered by the content hash, in wire order.
#[derive(Serialize)]
struct UnsignedFields<'a> {
    from: &'a str,
    to: &'a str,
    txtype: TxType,
    txfee: u64,
    timestamp: Timestamp,
    payload: &'a str,
}

impl Transaction {
    /// Build an unsigned transaction and compute its content hash.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        tx_type: TxType,
        fee: u64,
        timestamp: Timestamp,
        payload: impl Into<String>,
    ) -> Self {
        let mut tx = Self {
            from: from.into(),
            to: to.into(),
            tx_type,
            fee,
            timestamp,
            payload: payload.into(),
            hash: TxHash::ZERO,
            signature: None,
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Build and sign a transaction sent from `keys` at the current time.
    pub fn signed(
        keys: &KeyPair,
        to: impl Into<String>,
        tx_type: TxType,
        fee: u64,
        payload: impl Into<String>,
    ) -> Self {
        let mut tx = Self::new(
            keys.public.encode(),
            to,
            tx_type,
            fee,
            Timestamp::now(),
            payload,
        );
        tx.sign(&keys.private);
        tx
    }

    /// SHA-256 over the JSON form of the unsigned fields.
    pub fn compute_hash(&self) -> TxHash {
        let fields = UnsignedFields {
            from: &self.from,
            to: &self.to,
            txtype: self.tx_type,
            txfee: self.fee,
            timestamp: self.timestamp,
            payload: &self.payload,
        };
        // A struct of strings and integers always serializes.
        let bytes = serde_json::to_vec(&fields).unwrap_or_default();
        TxHash::new(sha256(&bytes))
    }

    /// Sign the raw 32 bytes of the content hash.
    pub fn sign(&mut self, private_key: &PrivateKey) {
        self.signature = Some(sign_digest(private_key, self.hash.as_bytes()));
    }

    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn verify_signature(&self) -> bool {
        self.signature
            .as_ref()
            .is_some_and(|sig| verify_encoded(&self.from, self.hash.as_bytes(), sig).is_ok())
    }

    /// Stateless format check: the hash matches the content and the signature
    /// verifies under the declared sender.
    pub fn verify(&self) -> Result<(), TransactionError> {
        let tx_hash = self.hash.to_hex();
        if !self.verify_hash() {
            return Err(TransactionError::HashMismatch { tx_hash });
        }
        let Some(signature) = &self.signature else {
            return Err(TransactionError::Unsigned { tx_hash });
        };
        match verify_encoded(&self.from, self.hash.as_bytes(), signature) {
            Ok(()) => Ok(()),
            Err(CryptoError::BadSignature) => Err(TransactionError::InvalidSignature { tx_hash }),
            Err(e) => Err(TransactionError::InvalidSender(e.to_string())),
        }
    }

    /// Parse the payload of an application transaction.
    pub fn signed_merit(&self) -> Option<SignedMerit> {
        if self.tx_type != TxType::Application {
            return None;
        }
        SignedMerit::from_json(&self.payload).ok()
    }

    pub fn to_json(&self) -> Result<String, TransactionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TransactionError> {
        Ok(serde_json::from_str(json)?)
    }
}
