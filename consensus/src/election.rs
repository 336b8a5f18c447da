//! Election state machine — settles one conflict root on a single winner.
//!
//! An election is created when a block is published for an already-occupied
//! root. Representatives vote; the weighted plurality block becomes
//! `last_winner`. Confirmation happens either when the winner's weight
//! reaches quorum or, failing that, after the announcement sweep has passed
//! the election enough times uncontested (settling time). Confirmation is
//! terminal and fires the confirmation action exactly once.

use crate::tally::VoteTally;
use crate::vote_generator::VoteGenerator;
use strand_ledger::Ledger;
use strand_types::{Amount, Block, Root, Vote};

/// Outcome of feeding one vote to an election.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteStatus {
    /// The vote entered the tally.
    Accepted { winner_changed: bool },
    /// Same or lower sequence than a vote already held; no-op.
    Replay,
    /// The election is already confirmed; the vote is discarded.
    Ignored,
}

/// A pending confirmation: the one-shot action paired with the winning block.
///
/// Returned instead of invoked so callers can release every lock before the
/// callback runs. Dropping it without calling [`fire`](Self::fire) would lose
/// the confirmation, hence `must_use`.
#[must_use = "a confirmation does nothing until fired"]
pub struct Confirmation {
    action: Box<dyn FnOnce(Block) + Send>,
    winner: Block,
}

impl Confirmation {
    pub fn winner(&self) -> &Block {
        &self.winner
    }

    /// Invoke the confirmation action with the winning block.
    pub fn fire(self) {
        (self.action)(self.winner);
    }
}

pub struct Election {
    root: Root,
    votes: VoteTally,
    last_winner: Block,
    /// Seconds timestamp of the most recent tallied vote.
    last_vote_secs: u64,
    confirmed: bool,
    /// Taken exactly once by `confirm_once`; `None` afterwards.
    confirmation_action: Option<Box<dyn FnOnce(Block) + Send>>,
}

impl Election {
    /// Create an election for `block`'s root with `block` as the initial
    /// winner. `last_winner` is never empty from here on.
    pub fn new(
        block: Block,
        now_secs: u64,
        confirmation_action: impl FnOnce(Block) + Send + 'static,
    ) -> Self {
        Self {
            root: block.root(),
            votes: VoteTally::new(),
            last_winner: block,
            last_vote_secs: now_secs,
            confirmed: false,
            confirmation_action: Some(Box::new(confirmation_action)),
        }
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn last_winner(&self) -> &Block {
        &self.last_winner
    }

    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn last_vote_secs(&self) -> u64 {
        self.last_vote_secs
    }

    pub fn votes(&self) -> &VoteTally {
        &self.votes
    }

    /// Record a representative's vote and re-derive the winner.
    ///
    /// Votes for confirmed elections are discarded outright: a settled root
    /// is never reopened, so a cutoff confirmation cannot be overturned by a
    /// late heavier vote.
    pub fn vote(&mut self, vote: Vote, ledger: &dyn Ledger, now_secs: u64) -> VoteStatus {
        if self.confirmed {
            return VoteStatus::Ignored;
        }
        if !self.votes.vote(vote) {
            return VoteStatus::Replay;
        }
        self.last_vote_secs = now_secs;
        let winner_changed = self.recalculate_winner(ledger);
        VoteStatus::Accepted { winner_changed }
    }

    /// Re-derive `last_winner` from the tally by representative weight,
    /// breaking ties toward the lexicographically smallest hash. Returns
    /// `true` iff the winner changed.
    pub fn recalculate_winner(&mut self, ledger: &dyn Ledger) -> bool {
        let Some((winner, _)) = self.votes.winner(ledger) else {
            return false;
        };
        if winner.hash() == self.last_winner.hash() {
            return false;
        }
        tracing::debug!(
            root = %self.root,
            old = %self.last_winner.hash(),
            new = %winner.hash(),
            "election winner changed"
        );
        self.last_winner = winner;
        true
    }

    /// Generate self-votes for the current winner from each locally held
    /// representative and feed them back through the tally.
    pub fn compute_rep_votes(
        &mut self,
        local_reps: &mut [VoteGenerator],
        ledger: &dyn Ledger,
        now_secs: u64,
    ) {
        let winner = self.last_winner.clone();
        for rep in local_reps.iter_mut() {
            let vote = rep.generate(&winner);
            self.vote(vote, ledger, now_secs);
        }
    }

    /// Confirmation method 1: uncontested quorum. Confirms when the weight
    /// backing `last_winner` is at least `quorum` (a strict majority of
    /// online supply).
    pub fn confirm_if_quorum(&mut self, ledger: &dyn Ledger, quorum: Amount) -> Option<Confirmation> {
        let winner_weight = self.votes.weight_for(ledger, &self.last_winner.hash());
        if winner_weight >= quorum {
            self.confirm_once()
        } else {
            None
        }
    }

    /// Confirmation method 2: settling time. After enough announcement
    /// sweeps without contest, the current winner is declared final
    /// unconditionally.
    pub fn confirm_cutoff(&mut self) -> Option<Confirmation> {
        self.confirm_once()
    }

    /// Test-and-set the confirmed flag. On the first transition the
    /// confirmation action is handed back, paired with the winner, to be
    /// fired after the caller releases its locks. Every later call returns
    /// `None`.
    pub fn confirm_once(&mut self) -> Option<Confirmation> {
        if self.confirmed {
            return None;
        }
        self.confirmed = true;
        self.confirmation_action.take().map(|action| Confirmation {
            action,
            winner: self.last_winner.clone(),
        })
    }
}
