//! RPC request handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use merit_network::HeartBeatData;
use merit_node::{HeartbeatOutcome, MeritNode, StartOutcome};
use merit_types::BlockHash;

use crate::error::RpcError;

/// Shared handler state: the node context.
pub type AppState = Arc<MeritNode>;

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubmitTransactionResponse {
    pub hash: String,
    pub accepted: bool,
}

// ── Lifecycle ────────────────────────────────────────────────────────────

pub async fn start(State(node): State<AppState>) -> Result<&'static str, RpcError> {
    match node.start().await? {
        StartOutcome::Started => Ok("started\n"),
        StartOutcome::AlreadyRunning => Ok("already started\n"),
    }
}

// ── Peer protocol ────────────────────────────────────────────────────────

/// Full-chain handshake: the body is the caller's heartbeat.
pub async fn upload(State(node): State<AppState>, body: String) -> Result<String, RpcError> {
    let hb = parse_heartbeat(&body)?;
    Ok(node.upload(&hb)?)
}

pub async fn block(
    State(node): State<AppState>,
    Path((height, hash)): Path<(String, String)>,
) -> Result<String, RpcError> {
    let height: u64 = height
        .parse()
        .map_err(|_| RpcError::Malformed(format!("bad height {height:?}")))?;
    let block_hash = BlockHash::from_hex(&hash)
        .map_err(|e| RpcError::Malformed(format!("bad block hash: {e}")))?;
    node.block_json(height, &block_hash)?
        .ok_or(RpcError::BlockNotFound { height, hash })
}

pub async fn heartbeat_receive(
    State(node): State<AppState>,
    body: String,
) -> Result<StatusCode, RpcError> {
    let hb = parse_heartbeat(&body)?;
    let from = hb.addr.clone();
    let outcome = node.receive_heartbeat(hb).await;
    if outcome != HeartbeatOutcome::Accepted {
        debug!(peer = %from, ?outcome, "heartbeat not accepted");
    }
    Ok(StatusCode::OK)
}

pub async fn submit_transaction(
    State(node): State<AppState>,
    body: String,
) -> Result<Json<SubmitTransactionResponse>, RpcError> {
    let tx_hash = node.submit_transaction(&body).await?;
    Ok(Json(SubmitTransactionResponse {
        hash: tx_hash.to_hex(),
        accepted: true,
    }))
}

// ── Views ────────────────────────────────────────────────────────────────

pub async fn show(State(node): State<AppState>) -> String {
    node.show()
}

pub async fn canonical(State(node): State<AppState>) -> Result<String, RpcError> {
    Ok(node.canonical_dump()?)
}

pub async fn transactions(State(node): State<AppState>) -> impl IntoResponse {
    Json(node.transactions())
}

pub async fn merits(State(node): State<AppState>) -> impl IntoResponse {
    Json(node.merits())
}

pub async fn balance(State(node): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(node.balances())
}

pub async fn metrics(State(node): State<AppState>) -> Result<impl IntoResponse, RpcError> {
    let body = node.metrics().encode()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

fn parse_heartbeat(body: &str) -> Result<HeartBeatData, RpcError> {
    HeartBeatData::from_json(body).map_err(|e| RpcError::Malformed(format!("heartbeat: {e}")))
}
