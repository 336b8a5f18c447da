//! Fundamental types for the strand protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: hashes, accounts, amounts, blocks, votes, and the per-network
//! protocol parameters.

pub mod amount;
pub mod block;
pub mod hash;
pub mod keys;
pub mod network;
pub mod time;
pub mod vote;
pub mod work;

pub use amount::Amount;
pub use block::{Block, BlockKind, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock};
pub use hash::{BlockHash, Root};
pub use keys::{Account, KeyPair, PrivateKey, Signature};
pub use network::NetworkId;
pub use vote::Vote;
