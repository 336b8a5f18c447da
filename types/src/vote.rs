//! Representative votes.

use crate::block::Block;
use crate::hash::BlockHash;
use crate::keys::{Account, Signature};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

type Blake2b256 = Blake2b<U32>;

/// A representative's vote for a block.
///
/// Sequence numbers increase monotonically per representative; a vote with a
/// higher sequence supersedes any earlier vote from the same representative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// The voting representative.
    pub account: Account,
    /// Signature over [`Vote::hash`].
    pub signature: Signature,
    /// Monotone per-representative sequence number.
    pub sequence: u64,
    /// The block being voted for.
    pub block: Block,
}

impl Vote {
    /// The message a representative signs: Blake2b over the block hash and
    /// the little-endian sequence number.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Blake2b256::new();
        hasher.update(self.block.hash().as_bytes());
        hasher.update(self.sequence.to_le_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        BlockHash::new(out)
    }
}
