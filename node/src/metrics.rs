//! Prometheus metrics for the merit node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] that the HTTP
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks this node sealed.
    pub blocks_mined: IntCounter,
    /// Gossiped blocks that passed validation and were inserted.
    pub blocks_accepted: IntCounter,
    pub blocks_rejected: IntCounter,
    /// Transactions admitted to the queue.
    pub transactions_admitted: IntCounter,
    pub transactions_rejected: IntCounter,
    /// Ancestor lookups issued to peers.
    pub backfill_requests: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Highest height ever inserted.
    pub chain_length: IntGauge,
    pub peer_count: IntGauge,
    /// Transactions waiting in the admission queue.
    pub queue_depth: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        // Counters
        let blocks_mined = register_int_counter_with_registry!(
            Opts::new("merit_blocks_mined_total", "Total blocks sealed by this node"),
            registry
        )?;

        let blocks_accepted = register_int_counter_with_registry!(
            Opts::new(
                "merit_blocks_accepted_total",
                "Total gossiped blocks accepted into the chain"
            ),
            registry
        )?;

        let blocks_rejected = register_int_counter_with_registry!(
            Opts::new(
                "merit_blocks_rejected_total",
                "Total gossiped blocks rejected by validation"
            ),
            registry
        )?;

        let transactions_admitted = register_int_counter_with_registry!(
            Opts::new(
                "merit_transactions_admitted_total",
                "Total transactions admitted to the queue"
            ),
            registry
        )?;

        let transactions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "merit_transactions_rejected_total",
                "Total transactions rejected at admission"
            ),
            registry
        )?;

        let backfill_requests = register_int_counter_with_registry!(
            Opts::new(
                "merit_backfill_requests_total",
                "Total missing-ancestor lookups"
            ),
            registry
        )?;

        // Gauges
        let chain_length = register_int_gauge_with_registry!(
            Opts::new("merit_chain_length", "Highest block height known"),
            registry
        )?;

        let peer_count = register_int_gauge_with_registry!(
            Opts::new("merit_peer_count", "Current size of the peer directory"),
            registry
        )?;

        let queue_depth = register_int_gauge_with_registry!(
            Opts::new("merit_queue_depth", "Transactions waiting to be mined"),
            registry
        )?;

        Ok(Self {
            registry,
            blocks_mined,
            blocks_accepted,
            blocks_rejected,
            transactions_admitted,
            transactions_rejected,
            backfill_requests,
            chain_length,
            peer_count,
            queue_depth,
        })
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| NodeError::Internal(e.to_string()))
    }
}
