//! Vote tally — the current vote held from each representative.

use std::collections::HashMap;
use strand_ledger::Ledger;
use strand_types::{Account, Amount, Block, BlockHash, Vote};

/// One vote per representative, always the highest sequence observed.
///
/// A replayed or lower-sequence vote is discarded, which makes vote delivery
/// idempotent under datagram duplication and reordering.
#[derive(Default)]
pub struct VoteTally {
    votes: HashMap<Account, Vote>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote. Returns `true` iff the tally changed (first vote from
    /// this representative, or a strictly higher sequence).
    pub fn vote(&mut self, vote: Vote) -> bool {
        match self.votes.get(&vote.account) {
            Some(existing) if existing.sequence >= vote.sequence => false,
            _ => {
                self.votes.insert(vote.account, vote);
                true
            }
        }
    }

    /// The vote currently held from a representative.
    pub fn get(&self, representative: &Account) -> Option<&Vote> {
        self.votes.get(representative)
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    /// Weight voting for each distinct block, with a representative block
    /// instance per hash.
    pub fn weighted(&self, ledger: &dyn Ledger) -> HashMap<BlockHash, (Block, Amount)> {
        let mut totals: HashMap<BlockHash, (Block, Amount)> = HashMap::new();
        for vote in self.votes.values() {
            let weight = ledger.weight(&vote.account);
            let hash = vote.block.hash();
            totals
                .entry(hash)
                .and_modify(|(_, w)| *w = w.saturating_add(weight))
                .or_insert_with(|| (vote.block.clone(), weight));
        }
        totals
    }

    /// The plurality winner by representative weight. Equal weights break
    /// toward the lexicographically smallest block hash so every node picks
    /// the same winner from the same tally.
    pub fn winner(&self, ledger: &dyn Ledger) -> Option<(Block, Amount)> {
        let totals = self.weighted(ledger);
        let mut best: Option<(BlockHash, Block, Amount)> = None;
        for (hash, (block, weight)) in totals {
            let better = match &best {
                None => true,
                Some((best_hash, _, best_weight)) => {
                    weight > *best_weight || (weight == *best_weight && hash < *best_hash)
                }
            };
            if better {
                best = Some((hash, block, weight));
            }
        }
        best.map(|(_, block, weight)| (block, weight))
    }

    /// Weight currently voting for a specific block.
    pub fn weight_for(&self, ledger: &dyn Ledger, hash: &BlockHash) -> Amount {
        self.votes
            .values()
            .filter(|v| v.block.hash() == *hash)
            .map(|v| ledger.weight(&v.account))
            .sum()
    }

    /// Total weight of every representative in the tally, regardless of which
    /// block they back.
    pub fn total_weight(&self, ledger: &dyn Ledger) -> Amount {
        self.votes
            .keys()
            .map(|account| ledger.weight(account))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_nullables::NullLedger;
    use strand_types::{SendBlock, Signature};

    fn rep(byte: u8) -> Account {
        Account::new([byte; 32])
    }

    fn block(byte: u8) -> Block {
        Block::Send(SendBlock {
            previous: BlockHash::new([byte; 32]),
            destination: Account::new([0xEE; 32]),
            balance: Amount::new(1),
            work: 0,
            signature: Signature::ZERO,
        })
    }

    fn vote(account: Account, sequence: u64, block: Block) -> Vote {
        Vote {
            account,
            signature: Signature::ZERO,
            sequence,
            block,
        }
    }

    #[test]
    fn first_vote_applies() {
        let mut tally = VoteTally::new();
        assert!(tally.vote(vote(rep(1), 1, block(1))));
        assert_eq!(tally.len(), 1);
    }

    #[test]
    fn replay_is_noop() {
        let mut tally = VoteTally::new();
        tally.vote(vote(rep(1), 1, block(1)));
        assert!(!tally.vote(vote(rep(1), 1, block(1))));
        assert_eq!(tally.len(), 1);
    }

    #[test]
    fn lower_sequence_discarded() {
        let mut tally = VoteTally::new();
        tally.vote(vote(rep(1), 5, block(1)));
        assert!(!tally.vote(vote(rep(1), 4, block(2))));
        assert_eq!(tally.get(&rep(1)).unwrap().block.hash(), block(1).hash());
    }

    #[test]
    fn higher_sequence_supersedes() {
        let mut tally = VoteTally::new();
        tally.vote(vote(rep(1), 1, block(1)));
        assert!(tally.vote(vote(rep(1), 2, block(2))));
        assert_eq!(tally.len(), 1);
        assert_eq!(tally.get(&rep(1)).unwrap().sequence, 2);
    }

    #[test]
    fn winner_by_weight() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(300));
        ledger.set_weight(rep(2), Amount::new(500));

        let mut tally = VoteTally::new();
        tally.vote(vote(rep(1), 1, block(1)));
        tally.vote(vote(rep(2), 1, block(2)));

        let (winner, weight) = tally.winner(&ledger).unwrap();
        assert_eq!(winner.hash(), block(2).hash());
        assert_eq!(weight, Amount::new(500));
    }

    #[test]
    fn equal_weight_breaks_to_smallest_hash() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(100));
        ledger.set_weight(rep(2), Amount::new(100));

        let a = block(1);
        let b = block(2);
        let smallest = if a.hash() < b.hash() { a.clone() } else { b.clone() };

        let mut tally = VoteTally::new();
        tally.vote(vote(rep(1), 1, a));
        tally.vote(vote(rep(2), 1, b));

        let (winner, _) = tally.winner(&ledger).unwrap();
        assert_eq!(winner.hash(), smallest.hash());
    }

    #[test]
    fn weight_for_counts_only_backers() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(100));
        ledger.set_weight(rep(2), Amount::new(70));

        let mut tally = VoteTally::new();
        tally.vote(vote(rep(1), 1, block(1)));
        tally.vote(vote(rep(2), 1, block(2)));

        assert_eq!(tally.weight_for(&ledger, &block(1).hash()), Amount::new(100));
        assert_eq!(tally.total_weight(&ledger), Amount::new(170));
    }

    #[test]
    fn empty_tally_has_no_winner() {
        let ledger = NullLedger::new();
        assert!(VoteTally::new().winner(&ledger).is_none());
    }

    proptest::proptest! {
        /// Whatever order sequences arrive in, the tally holds exactly one
        /// vote per representative carrying the maximum sequence seen, and
        /// redelivering the whole history changes nothing.
        #[test]
        fn sequences_converge_to_the_maximum(
            sequences in proptest::collection::vec(1u64..100, 1..20)
        ) {
            let mut tally = VoteTally::new();
            for &sequence in &sequences {
                tally.vote(vote(rep(1), sequence, block(sequence as u8)));
            }
            let max = *sequences.iter().max().unwrap();
            proptest::prop_assert_eq!(tally.len(), 1);
            proptest::prop_assert_eq!(tally.get(&rep(1)).unwrap().sequence, max);

            for &sequence in &sequences {
                proptest::prop_assert!(!tally.vote(vote(rep(1), sequence, block(sequence as u8))));
            }
            proptest::prop_assert_eq!(tally.get(&rep(1)).unwrap().sequence, max);
        }
    }
}
