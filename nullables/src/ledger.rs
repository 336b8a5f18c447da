//! Nullable ledger — a scripted `Ledger` implementation.
//!
//! Tests configure representative weights, per-hash process results, and
//! successor blocks up front, then assert on the calls the core made.

use std::collections::HashMap;
use std::sync::Mutex;
use strand_ledger::{Ledger, ProcessResult};
use strand_types::{Account, Amount, Block, BlockHash, Root};

#[derive(Default)]
struct State {
    weights: HashMap<Account, Amount>,
    results: HashMap<BlockHash, ProcessResult>,
    successors: HashMap<Root, Block>,
    accounts: HashMap<BlockHash, Account>,
    heads: HashMap<Account, BlockHash>,
    supply: Amount,
    processed: Vec<BlockHash>,
}

/// A `Ledger` whose responses are scripted by the test.
///
/// Unscripted blocks process as [`ProcessResult::Progress`]; unscripted
/// weights are zero.
#[derive(Default)]
pub struct NullLedger {
    state: Mutex<State>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_weight(&self, representative: Account, weight: Amount) {
        self.state.lock().unwrap().weights.insert(representative, weight);
    }

    /// Script the classification returned when `hash` is processed.
    pub fn set_result(&self, hash: BlockHash, result: ProcessResult) {
        self.state.lock().unwrap().results.insert(hash, result);
    }

    pub fn set_successor(&self, root: Root, block: Block) {
        self.state.lock().unwrap().successors.insert(root, block);
    }

    pub fn set_block_account(&self, hash: BlockHash, account: Account) {
        self.state.lock().unwrap().accounts.insert(hash, account);
    }

    pub fn set_latest(&self, account: Account, head: BlockHash) {
        self.state.lock().unwrap().heads.insert(account, head);
    }

    pub fn set_supply(&self, supply: Amount) {
        self.state.lock().unwrap().supply = supply;
    }

    /// Hashes handed to `process`, in call order.
    pub fn processed(&self) -> Vec<BlockHash> {
        self.state.lock().unwrap().processed.clone()
    }
}

impl Ledger for NullLedger {
    fn process(&self, block: &Block) -> ProcessResult {
        let mut state = self.state.lock().unwrap();
        let hash = block.hash();
        state.processed.push(hash);
        state
            .results
            .get(&hash)
            .copied()
            .unwrap_or(ProcessResult::Progress)
    }

    fn weight(&self, representative: &Account) -> Amount {
        self.state
            .lock()
            .unwrap()
            .weights
            .get(representative)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn successor(&self, root: &Root) -> Option<Block> {
        self.state.lock().unwrap().successors.get(root).cloned()
    }

    fn block_account(&self, hash: &BlockHash) -> Option<Account> {
        self.state.lock().unwrap().accounts.get(hash).copied()
    }

    fn latest(&self, account: &Account) -> Option<BlockHash> {
        self.state.lock().unwrap().heads.get(account).copied()
    }

    fn supply(&self) -> Amount {
        self.state.lock().unwrap().supply
    }
}
