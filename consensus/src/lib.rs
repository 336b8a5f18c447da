//! Consensus — fork resolution via representative voting.
//!
//! Every block occupies a ledger slot identified by its *root* (the previous
//! block's hash, or the account for the first block of a chain). When two
//! blocks compete for a slot, an election tallies representative votes and
//! settles on a single winner per root.
//!
//! ## Module overview
//!
//! - [`tally`] — per-representative vote bookkeeping with sequence supersession.
//! - [`election`] — the per-root state machine (active → confirmed, one-shot).
//! - [`active_elections`] — registry of live conflicts and the announcement sweep.
//! - [`gap_cache`] — bounded buffer of orphaned blocks with a vote-weight
//!   bootstrap trigger.
//! - [`online_reps`] — online-supply measurement, quorum and bootstrap thresholds.
//! - [`vote_generator`] — signed self-votes for locally held representatives.

pub mod active_elections;
pub mod election;
pub mod gap_cache;
pub mod online_reps;
pub mod tally;
pub mod vote_generator;

pub use active_elections::{ActiveElections, ANNOUNCEMENTS_PER_INTERVAL, CONTIGUOUS_ANNOUNCEMENTS};
pub use election::{Confirmation, Election, VoteStatus};
pub use gap_cache::{GapCache, MAX_GAP_CACHE};
pub use online_reps::OnlineReps;
pub use tally::VoteTally;
pub use vote_generator::VoteGenerator;
