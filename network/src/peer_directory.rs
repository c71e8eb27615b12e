//! Bounded address→id peer directory with ring rebalancing.
//!
//! Every node keeps at most `max_len` peers. When the directory overflows,
//! the node sorts all known ids together with its own, and keeps the
//! `max_len / 2` closest neighbours on each side of itself on that ring.

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;

use crate::error::NetworkError;

// ── Directory state ────────────────────────────────────────────────────

#[derive(Debug)]
struct Inner {
    self_id: i32,
    peers: HashMap<String, i32>,
}

/// Thread-safe peer directory.
///
/// Every mutation and every check-then-act sequence takes the same lock, so
/// a rebalance is atomic against concurrent `add`/`delete`.
#[derive(Debug)]
pub struct PeerDirectory {
    inner: Mutex<Inner>,
    max_len: usize,
}

impl PeerDirectory {
    pub fn new(self_id: i32, max_len: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                self_id,
                peers: HashMap::new(),
            }),
            max_len,
        }
    }

    /// Set the local node's id, used as the centre of the rebalance ring.
    pub fn register(&self, self_id: i32) {
        self.inner.lock().self_id = self_id;
    }

    pub fn self_id(&self) -> i32 {
        self.inner.lock().self_id
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Insert or overwrite the id stored for `addr`.
    pub fn add(&self, addr: impl Into<String>, id: i32) {
        let addr = addr.into();
        let mut inner = self.inner.lock();
        if inner.peers.insert(addr.clone(), id) != Some(id) {
            tracing::debug!(peer = %addr, id, "peer added");
        }
    }

    /// Remove `addr`; returns whether it was present.
    pub fn delete(&self, addr: &str) -> bool {
        self.inner.lock().peers.remove(addr).is_some()
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.inner.lock().peers.contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().peers.is_empty()
    }

    /// Snapshot of the directory.
    pub fn copy(&self) -> HashMap<String, i32> {
        self.inner.lock().peers.clone()
    }

    /// Known peer addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self.inner.lock().peers.keys().cloned().collect();
        addrs.sort();
        addrs
    }

    // ── Rebalancing ────────────────────────────────────────────────────

    /// Trim the directory to the ring neighbourhood of the local id.
    ///
    /// Returns the number of peers dropped.
    pub fn rebalance(&self) -> usize {
        let mut inner = self.inner.lock();
        if inner.peers.len() <= self.max_len {
            return 0;
        }

        // `None` marks the local node; it sorts before any peer sharing its id.
        let mut ring: Vec<(i32, Option<&String>)> =
            inner.peers.iter().map(|(addr, id)| (*id, Some(addr))).collect();
        ring.push((inner.self_id, None));
        ring.sort();

        let n = ring.len();
        let Some(centre) = ring.iter().position(|(_, addr)| addr.is_none()) else {
            return 0;
        };

        let reach = (n - 1).min(self.max_len / 2);
        let mut keep: HashSet<String> = HashSet::with_capacity(self.max_len);
        for diff in 1..=reach {
            for idx in [(centre + n - diff) % n, (centre + diff) % n] {
                if let Some(addr) = ring[idx].1 {
                    keep.insert(addr.clone());
                }
            }
        }

        let before = inner.peers.len();
        inner.peers.retain(|addr, _| keep.contains(addr));
        let dropped = before - inner.peers.len();
        tracing::debug!(dropped, kept = inner.peers.len(), "peer directory rebalanced");
        dropped
    }

    // ── Serialization ──────────────────────────────────────────────────

    /// JSON object `{addr: id}` with addresses in sorted order.
    pub fn to_json(&self) -> Result<String, NetworkError> {
        let sorted: BTreeMap<String, i32> = self.copy().into_iter().collect();
        Ok(serde_json::to_string(&sorted)?)
    }

    /// Human-readable listing, one `addr=id` per line.
    pub fn show(&self) -> String {
        let sorted: BTreeMap<String, i32> = self.copy().into_iter().collect();
        let mut out = format!("This is PeerMap (self id {}):\n", self.self_id());
        for (addr, id) in sorted {
            out.push_str(&format!("addr={addr}, id={id}\n"));
        }
        out
    }

    /// Merge a serialized directory received from a peer.
    ///
    /// The entry for `self_addr` is never written. Returns the number of
    /// entries merged.
    pub fn inject_json(&self, json: &str, self_addr: &str) -> Result<usize, NetworkError> {
        if json.trim().is_empty() {
            return Ok(0);
        }
        let incoming: HashMap<String, i32> = serde_json::from_str(json)?;
        let mut inner = self.inner.lock();
        let mut merged = 0;
        for (addr, id) in incoming {
            if addr == self_addr {
                continue;
            }
            inner.peers.insert(addr, id);
            merged += 1;
        }
        Ok(merged)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
