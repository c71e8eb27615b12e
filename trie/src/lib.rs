//! Merkle Patricia trie for the merit ledger.
//!
//! Every sealed block carries one trie mapping transaction hashes to
//! serialized transactions; the trie root authenticates the block's payload.
//!
//! - [`nibbles`]: key to nibble-path conversion and compact prefix encoding
//! - [`node`]: the node variants and their content hashes
//! - [`trie`]: the copy-on-write trie over a content-addressed node table

pub mod error;
pub mod nibbles;
pub mod node;
pub mod trie;

pub use error::TrieError;
pub use nibbles::{compact_decode, compact_encode, key_to_nibbles, TERMINATOR};
pub use node::{TrieNode, EMPTY_ROOT};
pub use trie::Trie;
