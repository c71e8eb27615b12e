//! Fee-priority transaction admission queue.
//!
//! Transactions wait here between admission and mining. Higher fees pop
//! first, ties pop in arrival order, and a transaction hash is never held
//! twice.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use merit_transactions::Transaction;
use merit_types::TxHash;

/// A transaction wrapped with its arrival order.
struct QueuedTransaction {
    tx: Transaction,
    /// Insertion order counter for FIFO tiebreaking among equal fees.
    sequence: u64,
}

impl Eq for QueuedTransaction {}

impl PartialEq for QueuedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.tx.fee == other.tx.fee && self.sequence == other.sequence
    }
}

impl Ord for QueuedTransaction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher fee first; on tie, earlier arrival first.
        self.tx
            .fee
            .cmp(&other.tx.fee)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedTransaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct QueueState {
    heap: BinaryHeap<QueuedTransaction>,
    hashes: HashSet<TxHash>,
    next_sequence: u64,
}

impl QueueState {
    fn push(&mut self, tx: Transaction) -> bool {
        if !self.hashes.insert(tx.hash) {
            return false;
        }
        self.next_sequence += 1;
        self.heap.push(QueuedTransaction {
            tx,
            sequence: self.next_sequence,
        });
        true
    }

    fn pop(&mut self) -> Option<Transaction> {
        let entry = self.heap.pop()?;
        self.hashes.remove(&entry.tx.hash);
        Some(entry.tx)
    }
}

/// Thread-safe admission queue shared by every producer (HTTP and gossip
/// ingestion) and the single mining consumer.
#[derive(Default)]
pub struct AdmissionQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a transaction. Returns `false` if its hash is already queued.
    pub async fn push(&self, tx: Transaction) -> bool {
        let added = self.state.lock().await.push(tx);
        if added {
            self.notify.notify_one();
        }
        added
    }

    /// Remove up to `n` highest-fee transactions.
    ///
    /// Entries for which `in_chain` holds were mined in the meantime; they
    /// are dropped and do not count toward `n`.
    pub async fn pull<F>(&self, n: usize, in_chain: F) -> Vec<Transaction>
    where
        F: Fn(&TxHash) -> bool,
    {
        let mut state = self.state.lock().await;
        let mut pulled = Vec::with_capacity(n.min(state.heap.len()));
        while pulled.len() < n {
            let Some(tx) = state.pop() else { break };
            if in_chain(&tx.hash) {
                tracing::debug!(tx = %tx.hash, "dropping queued transaction already in chain");
                continue;
            }
            pulled.push(tx);
        }
        pulled
    }

    /// Put back transactions from an abandoned candidate block, skipping
    /// those now in the chain. Returns how many were re-queued.
    pub async fn release<F>(&self, txs: Vec<Transaction>, in_chain: F) -> usize
    where
        F: Fn(&TxHash) -> bool,
    {
        let mut state = self.state.lock().await;
        let mut released = 0;
        for tx in txs {
            if !in_chain(&tx.hash) && state.push(tx) {
                released += 1;
            }
        }
        drop(state);
        if released > 0 {
            self.notify.notify_one();
        }
        released
    }

    pub async fn contains(&self, hash: &TxHash) -> bool {
        self.state.lock().await.hashes.contains(hash)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.heap.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.heap.is_empty()
    }

    /// Wait until something is pushed or `timeout` elapses.
    ///
    /// Returns `true` if woken by a push.
    pub async fn wait_for_transactions(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.notify.notified())
            .await
            .is_ok()
    }
}
