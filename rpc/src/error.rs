//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use merit_node::NodeError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("block not found at height {height}: {hash}")]
    BlockNotFound { height: u64, hash: String },

    #[error("node error: {0}")]
    Node(#[from] NodeError),

    #[error("server error: {0}")]
    Server(String),
}

impl From<std::io::Error> for RpcError {
    fn from(e: std::io::Error) -> Self {
        Self::Server(e.to_string())
    }
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::BlockNotFound { .. } => StatusCode::NO_CONTENT,
            Self::Node(e) if e.is_rejection() => StatusCode::BAD_REQUEST,
            Self::Node(_) | Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::NO_CONTENT => status.into_response(),
            StatusCode::BAD_REQUEST => {
                debug!(error = %self, "request rejected");
                (status, self.to_string()).into_response()
            }
            _ => {
                error!(error = %self, "request failed");
                (status, self.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_block_is_no_content() {
        let err = RpcError::BlockNotFound {
            height: 3,
            hash: "ab".into(),
        };
        assert_eq!(err.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn rejections_are_client_errors() {
        let err = RpcError::from(NodeError::DuplicateTransaction {
            tx_hash: "ab".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RpcError::Malformed("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bring_up_failures_are_server_errors() {
        let err = RpcError::from(NodeError::Bootstrap {
            peer: "http://localhost:1".into(),
            reason: "timed out".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
