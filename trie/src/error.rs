use merit_types::NodeHash;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrieError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("node {0} missing from the node table")]
    MissingNode(NodeHash),

    #[error("malformed trie data: {0}")]
    Malformed(String),
}
