//! Credential payloads carried by application transactions.

use merit_types::Signature;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merit {
    pub experience: Vec<String>,
    pub education: Vec<String>,
}

/// The payload of an `application` transaction.
///
/// `hash` identifies the full application; an `acceptance` transaction names
/// it in its `to` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMerit {
    pub merit: Merit,
    pub hash: String,
    pub timestamp: i64,
    pub application_signature: Signature,
}

impl SignedMerit {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
