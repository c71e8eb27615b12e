//! Leading-zero difficulty prefix.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::WorkError;

/// Required prefix of zero hex digits on a proof-of-work hash.
///
/// The empty prefix accepts every nonce.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Difficulty(String);

impl Difficulty {
    pub fn new(prefix: impl Into<String>) -> Result<Self, WorkError> {
        let prefix = prefix.into();
        if prefix.chars().any(|c| c != '0') {
            return Err(WorkError::InvalidDifficulty(prefix));
        }
        Ok(Self(prefix))
    }

    /// A prefix of `n` zero digits.
    pub fn zeros(n: usize) -> Self {
        Self("0".repeat(n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of leading zero digits required.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_met_by(&self, pow_hash_hex: &str) -> bool {
        pow_hash_hex.starts_with(&self.0)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::zeros(5)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Difficulty {
    type Err = WorkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_five_zeros() {
        assert_eq!(Difficulty::default().as_str(), "00000");
    }

    #[test]
    fn rejects_non_zero_digits() {
        assert_eq!(
            Difficulty::new("00a"),
            Err(WorkError::InvalidDifficulty("00a".into()))
        );
        assert!("000".parse::<Difficulty>().is_ok());
    }

    #[test]
    fn prefix_match() {
        let d = Difficulty::zeros(3);
        assert!(d.is_met_by("000abc"));
        assert!(!d.is_met_by("00abc0"));
        assert!(Difficulty::zeros(0).is_met_by("ffff"));
    }
}
