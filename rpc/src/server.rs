//! Axum-based RPC server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use merit_node::MeritNode;

use crate::error::RpcError;
use crate::handlers;

/// Build the router serving every route of the node.
pub fn router(node: Arc<MeritNode>) -> Router {
    Router::new()
        .route("/start", get(handlers::start))
        .route("/show", get(handlers::show))
        .route("/upload", post(handlers::upload))
        .route("/block/:height/:hash", get(handlers::block))
        .route("/heartbeat/receive", post(handlers::heartbeat_receive))
        .route("/canonical", get(handlers::canonical))
        .route("/transaction", post(handlers::submit_transaction))
        .route("/transactions", get(handlers::transactions))
        .route("/merits", get(handlers::merits))
        .route("/balance", get(handlers::balance))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

pub struct RpcServer {
    node: Arc<MeritNode>,
}

impl RpcServer {
    pub fn new(node: Arc<MeritNode>) -> Self {
        Self { node }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.node))
    }

    /// Bind `addr` and serve until `shutdown` resolves.
    pub async fn start<F>(&self, addr: SocketAddr, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        info!(addr = %local, node = %self.node.self_addr(), "RPC server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("RPC server stopped");
        Ok(())
    }
}
