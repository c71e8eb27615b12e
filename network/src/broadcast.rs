//! Flood-based heartbeat broadcasting.
//!
//! Every target peer receives the same envelope concurrently; a peer that
//! fails or times out is counted and skipped, never retried here.

use futures_util::future::join_all;

use crate::client::PeerClient;
use crate::heartbeat::HeartBeatData;

/// Outcome of a broadcast attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Peers that acknowledged the heartbeat.
    pub sent: usize,
    /// Peers that were unreachable or rejected it.
    pub failed: usize,
}

/// Push `heartbeat` to every address in `peers`.
pub async fn flood<C>(client: &C, peers: &[String], heartbeat: &HeartBeatData) -> BroadcastResult
where
    C: PeerClient + ?Sized,
{
    let outcomes = join_all(
        peers
            .iter()
            .map(|peer| async move { (peer, client.send_heartbeat(peer, heartbeat).await) }),
    )
    .await;

    let mut result = BroadcastResult::default();
    for (peer, outcome) in outcomes {
        match outcome {
            Ok(()) => result.sent += 1,
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "heartbeat not delivered");
                result.failed += 1;
            }
        }
    }
    result
}
