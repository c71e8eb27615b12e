use merit_crypto::{sha3_256, sha3_256_multi};
use merit_types::NodeHash;
use std::fmt;

use crate::nibbles::{compact_encode, TERMINATOR};

/// Root hash of a trie with no entries: SHA3-256 of the empty string.
pub const EMPTY_ROOT: NodeHash = NodeHash::new([
    0xa7, 0xff, 0xc6, 0xf8, 0xbf, 0x1e, 0xd7, 0x66, 0x51, 0xc1, 0x47, 0x56, 0xa0, 0x61, 0xd6, 0x62,
    0xf5, 0x80, 0xff, 0x4d, 0xe4, 0x3b, 0x49, 0xfa, 0x82, 0xd8, 0x0a, 0x4b, 0x80, 0xf8, 0x43, 0x4a,
]);

// ── Node ────────────────────────────────────────────────────────────────────

/// A trie node.
///
/// Leaf and extension paths are held as raw nibbles (no terminator); the
/// compact form is produced by [`TrieNode::encoded_prefix`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrieNode {
    Empty,

    /// 16 nibble-indexed children plus the value of a key ending here.
    Branch {
        children: Box<[Option<NodeHash>; 16]>,
        value: Option<String>,
    },

    /// Remaining key path and the stored value.
    Leaf { path: Vec<u8>, value: String },

    /// Shared path and the hash of the branch below it.
    Extension { path: Vec<u8>, child: NodeHash },
}

impl TrieNode {
    pub fn empty_branch() -> Self {
        TrieNode::Branch {
            children: Box::new([None; 16]),
            value: None,
        }
    }

    /// Compact-encoded prefix of a leaf or extension.
    pub fn encoded_prefix(&self) -> Option<Vec<u8>> {
        match self {
            TrieNode::Leaf { path, .. } => Some(compact_encode(&terminated(path))),
            TrieNode::Extension { path, .. } => Some(compact_encode(path)),
            _ => None,
        }
    }

    /// Number of occupied child slots plus the terminal value, if any.
    pub fn live_slots(&self) -> usize {
        match self {
            TrieNode::Branch { children, value } => {
                children.iter().filter(|c| c.is_some()).count() + usize::from(value.is_some())
            }
            _ => 0,
        }
    }

    /// SHA3-256 over the node's canonical serialization.
    ///
    /// A branch hashes its 17 slots in order, each marked present or absent.
    /// A leaf hashes its value followed by its decoded path (terminator
    /// included); an extension hashes its child hash followed by its path.
    pub fn hash(&self) -> NodeHash {
        match self {
            TrieNode::Empty => EMPTY_ROOT,
            TrieNode::Branch { children, value } => {
                let mut buf = Vec::with_capacity(7 + 16 * 33 + 9);
                buf.extend_from_slice(b"branch");
                for child in children.iter() {
                    match child {
                        Some(h) => {
                            buf.push(1);
                            buf.extend_from_slice(h.as_bytes());
                        }
                        None => buf.push(0),
                    }
                }
                match value {
                    Some(v) => {
                        buf.push(1);
                        buf.extend_from_slice(&(v.len() as u64).to_be_bytes());
                        buf.extend_from_slice(v.as_bytes());
                    }
                    None => buf.push(0),
                }
                NodeHash::new(sha3_256(&buf))
            }
            TrieNode::Leaf { path, value } => NodeHash::new(sha3_256_multi(&[
                b"leaf",
                &(value.len() as u64).to_be_bytes(),
                value.as_bytes(),
                &terminated(path),
            ])),
            TrieNode::Extension { path, child } => NodeHash::new(sha3_256_multi(&[
                b"ext",
                child.as_bytes(),
                path,
            ])),
        }
    }
}

fn terminated(path: &[u8]) -> Vec<u8> {
    let mut p = Vec::with_capacity(path.len() + 1);
    p.extend_from_slice(path);
    p.push(TERMINATOR);
    p
}

impl fmt::Display for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieNode::Empty => write!(f, "[Null Node]"),
            TrieNode::Branch { children, value } => {
                write!(f, "Branch[")?;
                for (i, child) in children.iter().enumerate() {
                    if let Some(h) = child {
                        write!(f, "{i}={h}, ")?;
                    }
                }
                write!(f, "value={}]", value.as_deref().unwrap_or(""))
            }
            TrieNode::Leaf { path, value } => write!(f, "Leaf<{path:?}, value={value:?}>"),
            TrieNode::Extension { path, child } => write!(f, "Ext<{path:?}, child={child}>"),
        }
    }
}
