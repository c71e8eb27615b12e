//! Outbound peer calls.
//!
//! The runtime only talks to peers through [`PeerClient`]; every call has a
//! bounded timeout and a failure means "peer unreachable, try the next one".

use std::time::Duration;

use async_trait::async_trait;
use merit_types::BlockHash;
use reqwest::StatusCode;

use crate::error::NetworkError;
use crate::heartbeat::HeartBeatData;

#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Push a heartbeat to `peer`'s `/heartbeat/receive`.
    async fn send_heartbeat(&self, peer: &str, heartbeat: &HeartBeatData)
        -> Result<(), NetworkError>;

    /// Fetch the JSON of one block; `BlockNotFound` when the peer lacks it.
    async fn fetch_block(
        &self,
        peer: &str,
        height: u64,
        hash: &BlockHash,
    ) -> Result<String, NetworkError>;

    /// Full-chain handshake: announce ourselves and receive the serialized chain.
    async fn download_chain(
        &self,
        peer: &str,
        heartbeat: &HeartBeatData,
    ) -> Result<String, NetworkError>;
}

// ── HTTP implementation ────────────────────────────────────────────────

/// [`PeerClient`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(peer: &str, path: &str) -> String {
        format!("{}{}", peer.trim_end_matches('/'), path)
    }

    fn map_err(peer: &str, e: reqwest::Error) -> NetworkError {
        if e.is_timeout() {
            NetworkError::Timeout {
                peer: peer.to_string(),
            }
        } else {
            NetworkError::Unreachable {
                peer: peer.to_string(),
                reason: e.to_string(),
            }
        }
    }

    fn check_status(peer: &str, status: StatusCode) -> Result<(), NetworkError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(NetworkError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

impl Default for HttpPeerClient {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn send_heartbeat(
        &self,
        peer: &str,
        heartbeat: &HeartBeatData,
    ) -> Result<(), NetworkError> {
        let resp = self
            .http
            .post(Self::url(peer, "/heartbeat/receive"))
            .timeout(self.timeout)
            .json(heartbeat)
            .send()
            .await
            .map_err(|e| Self::map_err(peer, e))?;
        Self::check_status(peer, resp.status())
    }

    async fn fetch_block(
        &self,
        peer: &str,
        height: u64,
        hash: &BlockHash,
    ) -> Result<String, NetworkError> {
        let resp = self
            .http
            .get(Self::url(peer, &format!("/block/{height}/{hash}")))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::map_err(peer, e))?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Err(NetworkError::BlockNotFound {
                height,
                hash: hash.to_hex(),
            });
        }
        Self::check_status(peer, resp.status())?;
        resp.text().await.map_err(|e| Self::map_err(peer, e))
    }

    async fn download_chain(
        &self,
        peer: &str,
        heartbeat: &HeartBeatData,
    ) -> Result<String, NetworkError> {
        let resp = self
            .http
            .post(Self::url(peer, "/upload"))
            .timeout(self.timeout)
            .json(heartbeat)
            .send()
            .await
            .map_err(|e| Self::map_err(peer, e))?;
        Self::check_status(peer, resp.status())?;
        resp.text().await.map_err(|e| Self::map_err(peer, e))
    }
}
