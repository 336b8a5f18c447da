//! Gap cache — bounded buffer of orphaned blocks.
//!
//! A block whose predecessor is unknown cannot be validated yet. It waits
//! here, indexed by the missing hash, until either the predecessor arrives
//! (the entry is drained and replayed through the ledger), enough
//! representative weight votes for it to justify a bootstrap, or capacity
//! eviction removes it as the oldest entry.

use crate::tally::VoteTally;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use strand_ledger::Ledger;
use strand_types::{Amount, Block, BlockHash, Vote};

/// Maximum number of buffered orphans.
pub const MAX_GAP_CACHE: usize = 16_384;

/// One orphaned block and the votes observed for it while it waits.
pub struct GapInformation {
    /// Monotone arrival stamp; doubles as the eviction-order key.
    arrival: u64,
    /// The missing predecessor this block waits on.
    pub required: BlockHash,
    pub block: Block,
    votes: VoteTally,
    /// Set once the entry has crossed the bootstrap threshold so repeated
    /// votes do not re-trigger a fetch.
    bootstrap_requested: bool,
}

/// Bounded orphan buffer with three consistent indices: unique by block
/// hash, non-unique by required predecessor, and ordered by arrival for
/// O(log n) eviction.
pub struct GapCache {
    by_hash: HashMap<BlockHash, GapInformation>,
    by_required: HashMap<BlockHash, Vec<BlockHash>>,
    by_arrival: BTreeMap<u64, BlockHash>,
    next_arrival: u64,
    max: usize,
}

impl Default for GapCache {
    fn default() -> Self {
        Self::new(MAX_GAP_CACHE)
    }
}

impl GapCache {
    pub fn new(max: usize) -> Self {
        Self {
            by_hash: HashMap::new(),
            by_required: HashMap::new(),
            by_arrival: BTreeMap::new(),
            next_arrival: 0,
            max,
        }
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Buffer `block` until `required` arrives. Re-adding a block refreshes
    /// its arrival position so actively republished orphans are not the
    /// first evicted. Evicts the oldest entry when capacity is exceeded.
    pub fn add(&mut self, block: Block, required: BlockHash) {
        let hash = block.hash();
        let arrival = self.next_arrival;
        self.next_arrival += 1;

        if let Some(existing) = self.by_hash.get_mut(&hash) {
            self.by_arrival.remove(&existing.arrival);
            existing.arrival = arrival;
            self.by_arrival.insert(arrival, hash);
            return;
        }

        self.by_hash.insert(
            hash,
            GapInformation {
                arrival,
                required,
                block,
                votes: VoteTally::new(),
                bootstrap_requested: false,
            },
        );
        self.by_required.entry(required).or_default().push(hash);
        self.by_arrival.insert(arrival, hash);

        while self.by_hash.len() > self.max {
            let oldest = match self.by_arrival.iter().next() {
                Some((&arrival, &hash)) => (arrival, hash),
                None => break,
            };
            self.by_arrival.remove(&oldest.0);
            if let Some(info) = self.by_hash.remove(&oldest.1) {
                self.unlink_required(&info.required, &oldest.1);
                tracing::debug!(hash = %oldest.1, "gap cache full, evicted oldest entry");
            }
        }
    }

    /// Remove and return every block that was waiting on `required`. The
    /// caller replays them through the ledger.
    pub fn get(&mut self, required: &BlockHash) -> Vec<Block> {
        let hashes = self.by_required.remove(required).unwrap_or_default();
        let mut blocks = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(info) = self.by_hash.remove(&hash) {
                self.by_arrival.remove(&info.arrival);
                blocks.push(info.block);
            }
        }
        blocks
    }

    /// Merge a vote into the tally of the entry for the vote's block, if one
    /// is waiting. When the entry's accumulated representative weight reaches
    /// `threshold`, the vote's source endpoint is returned once as the
    /// bootstrap target; the entry itself remains until its predecessor is
    /// delivered.
    pub fn vote(
        &mut self,
        vote: &Vote,
        ledger: &dyn Ledger,
        threshold: Amount,
        source: SocketAddr,
    ) -> Option<SocketAddr> {
        let hash = vote.block.hash();
        let info = self.by_hash.get_mut(&hash)?;
        info.votes.vote(vote.clone());

        let weight = info.votes.total_weight(ledger);
        if weight >= threshold && !info.bootstrap_requested {
            info.bootstrap_requested = true;
            tracing::info!(
                hash = %hash,
                required = %info.required,
                %weight,
                "gap block reached bootstrap threshold"
            );
            return Some(source);
        }
        None
    }

    fn unlink_required(&mut self, required: &BlockHash, hash: &BlockHash) {
        if let Some(list) = self.by_required.get_mut(required) {
            list.retain(|h| h != hash);
            if list.is_empty() {
                self.by_required.remove(required);
            }
        }
    }
}
