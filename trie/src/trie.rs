//! Copy-on-write Merkle Patricia trie over a content-addressed node table.
//!
//! Mutations never edit a stored node in place: the old node is retired from
//! the table and its replacement stored under its new content hash, all the
//! way up to a new root. Identical subtrees at different positions share one
//! table entry, so entries are reference counted.

use merit_types::NodeHash;
use std::collections::{BTreeMap, HashMap};

use crate::error::TrieError;
use crate::nibbles::{common_prefix_len, key_to_nibbles};
use crate::node::{TrieNode, EMPTY_ROOT};

#[derive(Clone, Debug)]
struct StoredNode {
    node: TrieNode,
    refs: usize,
}

/// A trie mapping string keys to string values.
#[derive(Clone, Debug, Default)]
pub struct Trie {
    root: Option<NodeHash>,
    nodes: HashMap<NodeHash, StoredNode>,
    /// Flat key/value mirror used for enumeration and serialization only.
    mapping: BTreeMap<String, String>,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a trie by inserting every pair of a flat mapping.
    pub fn from_mapping<I, K, V>(entries: I) -> Result<Self, TrieError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut trie = Self::new();
        for (k, v) in entries {
            trie.insert(k, v)?;
        }
        Ok(trie)
    }

    pub fn root_hash(&self) -> NodeHash {
        self.root.unwrap_or(EMPTY_ROOT)
    }

    pub fn mapping(&self) -> &BTreeMap<String, String> {
        &self.mapping
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Number of distinct nodes in the node table.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, hash: &NodeHash) -> Option<&TrieNode> {
        self.nodes.get(hash).map(|s| &s.node)
    }

    // ── Get ─────────────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Result<&str, TrieError> {
        let not_found = || TrieError::NotFound(key.to_string());
        let path = key_to_nibbles(key);
        let mut rest: &[u8] = &path;
        let mut current = self.root.ok_or_else(not_found)?;

        loop {
            match self.load(&current)? {
                TrieNode::Leaf { path, value } => {
                    return if path.as_slice() == rest {
                        Ok(value.as_str())
                    } else {
                        Err(not_found())
                    };
                }
                TrieNode::Extension { path, child } => {
                    if !rest.starts_with(path) {
                        return Err(not_found());
                    }
                    rest = &rest[path.len()..];
                    current = *child;
                }
                TrieNode::Branch { children, value } => match rest.split_first() {
                    None => return value.as_deref().ok_or_else(not_found),
                    Some((&idx, tail)) => {
                        current = children[idx as usize].ok_or_else(not_found)?;
                        rest = tail;
                    }
                },
                TrieNode::Empty => return Err(not_found()),
            }
        }
    }

    // ── Insert ──────────────────────────────────────────────────────────────

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), TrieError> {
        let key = key.into();
        let value = value.into();
        let path = key_to_nibbles(&key);

        let new_root = match self.root {
            None => self.store(TrieNode::Leaf {
                path,
                value: value.clone(),
            }),
            Some(root) => self.insert_at(root, &path, value.clone())?,
        };
        self.root = Some(new_root);
        self.mapping.insert(key, value);
        Ok(())
    }

    fn insert_at(&mut self, hash: NodeHash, path: &[u8], value: String) -> Result<NodeHash, TrieError> {
        let node = self.load(&hash)?.clone();
        self.retire(&hash);

        let new_hash = match node {
            TrieNode::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                let common = common_prefix_len(&leaf_path, path);
                if common == leaf_path.len() && common == path.len() {
                    self.store(TrieNode::Leaf {
                        path: leaf_path,
                        value,
                    })
                } else {
                    let mut children = Box::new([None; 16]);
                    let mut branch_value = None;
                    self.place(&mut children, &mut branch_value, &leaf_path[common..], leaf_value);
                    self.place(&mut children, &mut branch_value, &path[common..], value);
                    let branch = self.store(TrieNode::Branch {
                        children,
                        value: branch_value,
                    });
                    self.wrap_in_extension(&path[..common], branch)
                }
            }
            TrieNode::Extension {
                path: ext_path,
                child,
            } => {
                let common = common_prefix_len(&ext_path, path);
                if common == ext_path.len() {
                    let child = self.insert_at(child, &path[common..], value)?;
                    self.store(TrieNode::Extension {
                        path: ext_path,
                        child,
                    })
                } else {
                    let mut children = Box::new([None; 16]);
                    let mut branch_value = None;
                    let ext_rest = &ext_path[common..];
                    children[ext_rest[0] as usize] = Some(if ext_rest.len() == 1 {
                        child
                    } else {
                        self.store(TrieNode::Extension {
                            path: ext_rest[1..].to_vec(),
                            child,
                        })
                    });
                    self.place(&mut children, &mut branch_value, &path[common..], value);
                    let branch = self.store(TrieNode::Branch {
                        children,
                        value: branch_value,
                    });
                    self.wrap_in_extension(&path[..common], branch)
                }
            }
            TrieNode::Branch {
                mut children,
                value: branch_value,
            } => match path.split_first() {
                None => self.store(TrieNode::Branch {
                    children,
                    value: Some(value),
                }),
                Some((&idx, tail)) => {
                    let slot = idx as usize;
                    children[slot] = Some(match children[slot] {
                        Some(child) => self.insert_at(child, tail, value)?,
                        None => self.store(TrieNode::Leaf {
                            path: tail.to_vec(),
                            value,
                        }),
                    });
                    self.store(TrieNode::Branch {
                        children,
                        value: branch_value,
                    })
                }
            },
            TrieNode::Empty => self.store(TrieNode::Leaf {
                path: path.to_vec(),
                value,
            }),
        };
        Ok(new_hash)
    }

    /// Put `value` into a fresh branch: the terminal slot when `rest` is
    /// exhausted, otherwise a leaf under the next nibble.
    fn place(
        &mut self,
        children: &mut [Option<NodeHash>; 16],
        branch_value: &mut Option<String>,
        rest: &[u8],
        value: String,
    ) {
        match rest.split_first() {
            None => *branch_value = Some(value),
            Some((&idx, tail)) => {
                children[idx as usize] = Some(self.store(TrieNode::Leaf {
                    path: tail.to_vec(),
                    value,
                }));
            }
        }
    }

    fn wrap_in_extension(&mut self, prefix: &[u8], branch: NodeHash) -> NodeHash {
        if prefix.is_empty() {
            branch
        } else {
            self.store(TrieNode::Extension {
                path: prefix.to_vec(),
                child: branch,
            })
        }
    }

    // ── Delete ──────────────────────────────────────────────────────────────

    /// Remove `key`, returning its value. An absent key fails with
    /// [`TrieError::NotFound`] and leaves the trie untouched.
    pub fn delete(&mut self, key: &str) -> Result<String, TrieError> {
        let old = self.get(key)?.to_string();
        let Some(root) = self.root else {
            return Err(TrieError::NotFound(key.to_string()));
        };
        let path = key_to_nibbles(key);
        self.root = self.delete_at(root, &path)?;
        self.mapping.remove(key);
        Ok(old)
    }

    /// Delete beneath `hash`; `None` means the subtree became empty.
    fn delete_at(&mut self, hash: NodeHash, path: &[u8]) -> Result<Option<NodeHash>, TrieError> {
        let node = self.load(&hash)?.clone();
        self.retire(&hash);

        match node {
            TrieNode::Leaf { .. } | TrieNode::Empty => Ok(None),
            TrieNode::Extension {
                path: ext_path,
                child,
            } => {
                let rest = path.get(ext_path.len()..).unwrap_or_default();
                let Some(new_child) = self.delete_at(child, rest)? else {
                    return Ok(None);
                };
                Ok(Some(self.prepend_path(&ext_path, new_child)?))
            }
            TrieNode::Branch {
                mut children,
                mut value,
            } => {
                match path.split_first() {
                    None => value = None,
                    Some((&idx, tail)) => {
                        let slot = idx as usize;
                        let child = children[slot]
                            .ok_or_else(|| TrieError::Malformed("delete path left the trie".into()))?;
                        children[slot] = self.delete_at(child, tail)?;
                    }
                }
                self.collapse(children, value)
            }
        }
    }

    /// Restore the two-live-slot invariant of a branch after a deletion.
    fn collapse(
        &mut self,
        children: Box<[Option<NodeHash>; 16]>,
        value: Option<String>,
    ) -> Result<Option<NodeHash>, TrieError> {
        let live = children.iter().filter(|c| c.is_some()).count() + usize::from(value.is_some());
        if live > 1 {
            return Ok(Some(self.store(TrieNode::Branch { children, value })));
        }
        if let Some(v) = value {
            return Ok(Some(self.store(TrieNode::Leaf {
                path: Vec::new(),
                value: v,
            })));
        }
        match children
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.map(|h| (i as u8, h)))
        {
            Some((idx, child)) => Ok(Some(self.prepend_path(&[idx], child)?)),
            None => Ok(None),
        }
    }

    /// Hang `child` below `prefix`, merging into a leaf or extension child.
    fn prepend_path(&mut self, prefix: &[u8], child: NodeHash) -> Result<NodeHash, TrieError> {
        let merged = match self.load(&child)? {
            TrieNode::Leaf { path, value } => Some(TrieNode::Leaf {
                path: [prefix, path.as_slice()].concat(),
                value: value.clone(),
            }),
            TrieNode::Extension { path, child } => Some(TrieNode::Extension {
                path: [prefix, path.as_slice()].concat(),
                child: *child,
            }),
            TrieNode::Branch { .. } | TrieNode::Empty => None,
        };
        Ok(match merged {
            Some(node) => {
                self.retire(&child);
                self.store(node)
            }
            None => self.store(TrieNode::Extension {
                path: prefix.to_vec(),
                child,
            }),
        })
    }

    // ── Node table ──────────────────────────────────────────────────────────

    fn load(&self, hash: &NodeHash) -> Result<&TrieNode, TrieError> {
        self.nodes
            .get(hash)
            .map(|s| &s.node)
            .ok_or(TrieError::MissingNode(*hash))
    }

    fn store(&mut self, node: TrieNode) -> NodeHash {
        let hash = node.hash();
        self.nodes
            .entry(hash)
            .and_modify(|s| s.refs += 1)
            .or_insert(StoredNode { node, refs: 1 });
        hash
    }

    fn retire(&mut self, hash: &NodeHash) {
        if let Some(stored) = self.nodes.get_mut(hash) {
            if stored.refs > 1 {
                stored.refs -= 1;
            } else {
                self.nodes.remove(hash);
            }
        }
    }
}

impl PartialEq for Trie {
    fn eq(&self, other: &Self) -> bool {
        self.root_hash() == other.root_hash()
    }
}

impl Eq for Trie {}
