use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("peer {peer} timed out")]
    Timeout { peer: String },

    #[error("peer does not hold block {hash} at height {height}")]
    BlockNotFound { height: u64, hash: String },

    #[error("peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },

    #[error("malformed peer data: {0}")]
    Malformed(String),
}

impl NetworkError {
    /// Whether the failure means "try the next peer".
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. } | Self::Status { .. })
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
