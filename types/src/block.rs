//! Ledger blocks.
//!
//! Each account forms its own chain of blocks. A block is polymorphic over
//! four variants — send, receive, open, change — and exposes a Blake2b hash
//! over its variant-specific fields, a conflict root, a work nonce, and the
//! account owner's signature over the hash.

use crate::amount::Amount;
use crate::hash::{BlockHash, Root};
use crate::keys::{Account, Signature};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

type Blake2b256 = Blake2b<U32>;

/// Discriminates the four block variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Send,
    Receive,
    Open,
    Change,
}

/// Debits an account, placing the sent amount in the destination's pending
/// set. `balance` is the sender's balance *after* the send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance: Amount,
    pub work: u64,
    pub signature: Signature,
}

/// Credits an account with a previously sent amount, referencing the source
/// send block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    pub source: BlockHash,
    pub work: u64,
    pub signature: Signature,
}

/// Opens an account chain: the first block of an account, receiving from
/// `source` and designating the initial representative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBlock {
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
    pub work: u64,
    pub signature: Signature,
}

/// Changes an account's representative without moving funds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: Account,
    pub work: u64,
    pub signature: Signature,
}

/// A ledger block, polymorphic over the four variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Send(_) => BlockKind::Send,
            Block::Receive(_) => BlockKind::Receive,
            Block::Open(_) => BlockKind::Open,
            Block::Change(_) => BlockKind::Change,
        }
    }

    /// The Blake2b-256 hash of the variant's hashable fields. This is the
    /// value the owner signs and the identifier votes refer to.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Blake2b256::new();
        match self {
            Block::Send(b) => {
                hasher.update(b.previous.as_bytes());
                hasher.update(b.destination.as_bytes());
                hasher.update(b.balance.raw().to_be_bytes());
            }
            Block::Receive(b) => {
                hasher.update(b.previous.as_bytes());
                hasher.update(b.source.as_bytes());
            }
            Block::Open(b) => {
                hasher.update(b.source.as_bytes());
                hasher.update(b.representative.as_bytes());
                hasher.update(b.account.as_bytes());
            }
            Block::Change(b) => {
                hasher.update(b.previous.as_bytes());
                hasher.update(b.representative.as_bytes());
            }
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        BlockHash::new(out)
    }

    /// The conflict identifier: the previous block's hash, or the account for
    /// an open block. Two blocks fork iff their roots are equal and their
    /// hashes differ.
    pub fn root(&self) -> Root {
        match self {
            Block::Send(b) => b.previous,
            Block::Receive(b) => b.previous,
            Block::Open(b) => b.account.as_root(),
            Block::Change(b) => b.previous,
        }
    }

    /// The predecessor this block extends, if any. Open blocks start a chain
    /// and have none.
    pub fn previous(&self) -> Option<BlockHash> {
        match self {
            Block::Send(b) => Some(b.previous),
            Block::Receive(b) => Some(b.previous),
            Block::Open(_) => None,
            Block::Change(b) => Some(b.previous),
        }
    }

    /// The send block this block receives from, if it is a receive/open.
    pub fn source(&self) -> Option<BlockHash> {
        match self {
            Block::Receive(b) => Some(b.source),
            Block::Open(b) => Some(b.source),
            _ => None,
        }
    }

    pub fn representative(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.representative),
            Block::Change(b) => Some(b.representative),
            _ => None,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Block::Send(b) => b.work,
            Block::Receive(b) => b.work,
            Block::Open(b) => b.work,
            Block::Change(b) => b.work,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Block::Send(b) => &b.signature,
            Block::Receive(b) => &b.signature,
            Block::Open(b) => &b.signature,
            Block::Change(b) => &b.signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_block(previous: [u8; 32], balance: u128) -> Block {
        Block::Send(SendBlock {
            previous: BlockHash::new(previous),
            destination: Account::new([9u8; 32]),
            balance: Amount::new(balance),
            work: 0,
            signature: Signature::ZERO,
        })
    }

    #[test]
    fn hash_is_deterministic() {
        let a = send_block([1u8; 32], 100);
        let b = send_block([1u8; 32], 100);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn hash_depends_on_fields() {
        let a = send_block([1u8; 32], 100);
        let b = send_block([1u8; 32], 101);
        let c = send_block([2u8; 32], 100);
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn hash_ignores_work_and_signature() {
        let mut inner = SendBlock {
            previous: BlockHash::new([1u8; 32]),
            destination: Account::new([9u8; 32]),
            balance: Amount::new(5),
            work: 0,
            signature: Signature::ZERO,
        };
        let before = Block::Send(inner.clone()).hash();
        inner.work = 42;
        inner.signature = Signature([7u8; 64]);
        assert_eq!(Block::Send(inner).hash(), before);
    }

    #[test]
    fn root_of_open_is_account() {
        let account = Account::new([5u8; 32]);
        let block = Block::Open(OpenBlock {
            source: BlockHash::new([1u8; 32]),
            representative: Account::new([2u8; 32]),
            account,
            work: 0,
            signature: Signature::ZERO,
        });
        assert_eq!(block.root(), account.as_root());
        assert_eq!(block.previous(), None);
    }

    #[test]
    fn root_of_others_is_previous() {
        let block = send_block([3u8; 32], 7);
        assert_eq!(block.root(), BlockHash::new([3u8; 32]));
        assert_eq!(block.previous(), Some(BlockHash::new([3u8; 32])));
    }

    #[test]
    fn variants_with_same_fields_hash_differently() {
        // A receive and a change sharing `previous` must not collide: the
        // second hashed field differs (source vs representative bytes).
        let receive = Block::Receive(ReceiveBlock {
            previous: BlockHash::new([1u8; 32]),
            source: BlockHash::new([2u8; 32]),
            work: 0,
            signature: Signature::ZERO,
        });
        let change = Block::Change(ChangeBlock {
            previous: BlockHash::new([1u8; 32]),
            representative: Account::new([3u8; 32]),
            work: 0,
            signature: Signature::ZERO,
        });
        assert_ne!(receive.hash(), change.hash());
    }
}
