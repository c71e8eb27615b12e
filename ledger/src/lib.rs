//! Block chain for the merit ledger.
//!
//! Blocks are indexed by height; several blocks at one height form an active
//! fork. The canonical chain is picked by a simple fork-avoidance rule: walk
//! down from the tip until a height holds exactly one block, optionally step
//! back a few more parents for finality, then follow parents to genesis.

pub mod block;
pub mod chain;
pub mod error;
pub mod sync;

pub use block::{Block, BlockHeader, BlockJson};
pub use chain::BlockChain;
pub use error::LedgerError;
pub use sync::SyncBlockChain;
