//! Signed vote production for a locally held representative key.

use strand_crypto::sign_message;
use strand_types::{Account, Block, KeyPair, Signature, Vote};

/// Produces signed votes for one representative with a monotonically
/// increasing sequence number. The wallet supplies the key; the core only
/// signs vote hashes with it.
pub struct VoteGenerator {
    keypair: KeyPair,
    sequence: u64,
}

impl VoteGenerator {
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            sequence: 0,
        }
    }

    /// Resume from a persisted sequence so restarts never reuse a number.
    pub fn with_sequence(keypair: KeyPair, sequence: u64) -> Self {
        Self { keypair, sequence }
    }

    pub fn account(&self) -> Account {
        self.keypair.public
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Sign a vote for `block` with the next sequence number.
    pub fn generate(&mut self, block: &Block) -> Vote {
        self.sequence += 1;
        let mut vote = Vote {
            account: self.keypair.public,
            signature: Signature::ZERO,
            sequence: self.sequence,
            block: block.clone(),
        };
        vote.signature = sign_message(vote.hash().as_bytes(), &self.keypair.private);
        vote
    }
}
