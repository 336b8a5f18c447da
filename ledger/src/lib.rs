//! The ledger interface consumed by the consensus core.
//!
//! Block validation rules and the persistent store live behind this trait;
//! the core only depends on the classification of a processed block and on
//! weight/successor lookups. Implementations own their transaction
//! discipline: every trait call is a complete transaction scope, and the core
//! never re-enters the ledger from inside a ledger callback.

use serde::{Deserialize, Serialize};
use strand_types::{Account, Amount, Block, BlockHash, Root};

/// Classification of a processed block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessResult {
    /// The block extended a chain and was stored.
    Progress,
    /// The block's previous is unknown; hold it until the predecessor
    /// arrives.
    GapPrevious,
    /// The block's source (linked send) is unknown.
    GapSource,
    /// The block is already in the ledger.
    Old,
    /// Another block already occupies this root; a conflict must be settled
    /// by election.
    Fork,
    /// The owner signature does not verify.
    BadSignature,
    /// The send balance exceeds the previous balance.
    NegativeSpend,
    /// The referenced source is not receivable by this account.
    Unreceivable,
    /// The receive references a block that is not a send.
    NotReceiveFromSend,
}

impl ProcessResult {
    /// Terminal rejections: the block can never become valid, so no election
    /// or gap entry is created for it.
    pub fn is_terminal_rejection(&self) -> bool {
        matches!(
            self,
            Self::Old
                | Self::BadSignature
                | Self::NegativeSpend
                | Self::Unreceivable
                | Self::NotReceiveFromSend
        )
    }
}

/// The ledger operations the consensus core depends on.
pub trait Ledger: Send + Sync {
    /// Validate and apply a block, returning its classification.
    fn process(&self, block: &Block) -> ProcessResult;

    /// The voting weight delegated to a representative account.
    fn weight(&self, representative: &Account) -> Amount;

    /// The block currently occupying `root`, if any. This is the ledger's
    /// side of a fork: the block a conflicting publish competes against.
    fn successor(&self, root: &Root) -> Option<Block>;

    /// The account that owns a stored block.
    fn block_account(&self, hash: &BlockHash) -> Option<Account>;

    /// The head block of an account chain.
    fn latest(&self, account: &Account) -> Option<BlockHash>;

    /// Total issued supply (upper bound for any weight sum).
    fn supply(&self) -> Amount;
}
