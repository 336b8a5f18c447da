//! Active transactions — the registry of live conflicts.
//!
//! At most one election exists per root. The registry routes votes to the
//! right election and drives the periodic announcement sweep that keeps every
//! fork moving toward confirmation.
//!
//! Methods return the side effects they produced (blocks to broadcast,
//! confirmations to fire) instead of invoking callbacks directly, so the
//! caller can release the registry lock first. The local vote generators are
//! borrowed per call: the node shares one sequence stream per representative
//! between the sweep and confirm-req answering.

use crate::election::{Confirmation, Election, VoteStatus};
use crate::vote_generator::VoteGenerator;
use std::collections::BTreeMap;
use strand_ledger::Ledger;
use strand_types::{Amount, Block, Root, Vote};

/// Maximum number of conflicts announced per sweep, lowest root first.
pub const ANNOUNCEMENTS_PER_INTERVAL: usize = 32;
/// After this many successive announcement passes an election settles by
/// cutoff.
pub const CONTIGUOUS_ANNOUNCEMENTS: u32 = 4;

/// Registry entry: one election plus its announcement counter.
pub struct ConflictInfo {
    pub election: Election,
    /// Number of announcement sweeps that have passed over this root.
    pub announcements: u32,
}

/// Effects of feeding one vote through the registry.
pub struct VoteAction {
    pub status: VoteStatus,
    /// The new winner, present when the vote flipped the election.
    pub broadcast: Option<Block>,
    /// Present when the vote pushed the winner past quorum.
    pub confirmation: Option<Confirmation>,
}

/// Effects of one announcement sweep.
#[derive(Default)]
pub struct AnnounceOutcome {
    /// Winners to republish to the network.
    pub broadcasts: Vec<Block>,
    /// Confirmations to fire (settling-time cutoffs and quorum crossings
    /// caused by local self-votes).
    pub confirmations: Vec<Confirmation>,
    /// Number of registry entries visited this sweep.
    pub processed: usize,
}

impl AnnounceOutcome {
    pub fn is_empty(&self) -> bool {
        self.broadcasts.is_empty() && self.confirmations.is_empty()
    }
}

/// All conflicts currently being settled, keyed uniquely by root.
pub struct ActiveElections {
    roots: BTreeMap<Root, ConflictInfo>,
}

impl Default for ActiveElections {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveElections {
    pub fn new() -> Self {
        Self {
            roots: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Membership test by the block's root.
    pub fn active(&self, block: &Block) -> bool {
        self.roots.contains_key(&block.root())
    }

    /// The current winner for a root, if an election is live.
    pub fn winner(&self, root: &Root) -> Option<&Block> {
        self.roots.get(root).map(|info| info.election.last_winner())
    }

    /// Start an election for `block`'s root, seeding it with votes from the
    /// locally held representatives. A root that already has an election is
    /// left untouched. Returns `true` iff a new election was created.
    pub fn start(
        &mut self,
        block: &Block,
        ledger: &dyn Ledger,
        local_reps: &mut [VoteGenerator],
        now_secs: u64,
        confirmation_action: impl FnOnce(Block) + Send + 'static,
    ) -> bool {
        let root = block.root();
        if self.roots.contains_key(&root) {
            return false;
        }
        let mut election = Election::new(block.clone(), now_secs, confirmation_action);
        election.compute_rep_votes(local_reps, ledger, now_secs);
        tracing::debug!(root = %root, hash = %block.hash(), "election started");
        self.roots.insert(
            root,
            ConflictInfo {
                election,
                announcements: 0,
            },
        );
        true
    }

    /// Route a vote to the election for its block's root. Returns `None`
    /// when no election is live for that root.
    pub fn vote(
        &mut self,
        vote: Vote,
        ledger: &dyn Ledger,
        quorum: Amount,
        now_secs: u64,
    ) -> Option<VoteAction> {
        let info = self.roots.get_mut(&vote.block.root())?;
        let status = info.election.vote(vote, ledger, now_secs);
        let broadcast = match status {
            VoteStatus::Accepted { winner_changed: true } => {
                Some(info.election.last_winner().clone())
            }
            _ => None,
        };
        let confirmation = match status {
            VoteStatus::Accepted { .. } => info.election.confirm_if_quorum(ledger, quorum),
            _ => None,
        };
        Some(VoteAction {
            status,
            broadcast,
            confirmation,
        })
    }

    /// The announcement sweep: visit up to [`ANNOUNCEMENTS_PER_INTERVAL`]
    /// elections in root order. Confirmed entries are erased; entries that
    /// have been announced [`CONTIGUOUS_ANNOUNCEMENTS`] times settle by
    /// cutoff and are erased; the rest are re-voted by the local
    /// representatives and their winner queued for broadcast.
    ///
    /// Bounding per-sweep work and erasing settled entries within four passes
    /// means every live election is visited within a few intervals — no fork
    /// starves another.
    pub fn announce_votes(
        &mut self,
        ledger: &dyn Ledger,
        local_reps: &mut [VoteGenerator],
        quorum: Amount,
        now_secs: u64,
    ) -> AnnounceOutcome {
        let mut outcome = AnnounceOutcome::default();
        let mut erase = Vec::new();

        for (root, info) in self.roots.iter_mut().take(ANNOUNCEMENTS_PER_INTERVAL) {
            outcome.processed += 1;

            if info.election.confirmed() {
                // Confirmed on a previous vote; reclaim the slot this sweep.
                erase.push(*root);
                continue;
            }

            info.announcements += 1;
            if info.announcements >= CONTIGUOUS_ANNOUNCEMENTS {
                tracing::debug!(root = %root, "election settled by cutoff");
                if let Some(confirmation) = info.election.confirm_cutoff() {
                    outcome.confirmations.push(confirmation);
                }
                erase.push(*root);
            } else {
                info.election.compute_rep_votes(local_reps, ledger, now_secs);
                if let Some(confirmation) = info.election.confirm_if_quorum(ledger, quorum) {
                    outcome.confirmations.push(confirmation);
                    erase.push(*root);
                } else {
                    outcome.broadcasts.push(info.election.last_winner().clone());
                }
            }
        }

        for root in erase {
            self.roots.remove(&root);
        }
        outcome
    }
}
