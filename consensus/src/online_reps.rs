//! Online representative tracking — the quorum denominator.
//!
//! Quorum is measured against *online* supply, not total delegated weight: a
//! representative counts as online while it has voted within the sampling
//! window. Preconfigured representatives count even when quiet, and the
//! configured inactive supply acts as a floor so quorum cannot collapse when
//! the node has heard from almost nobody.

use std::collections::HashSet;
use strand_ledger::Ledger;
use strand_types::{Account, Amount};

/// Default sampling window: a representative that voted within the last five
/// minutes is online.
pub const DEFAULT_WINDOW_SECS: u64 = 300;

pub struct OnlineReps {
    /// Representative → seconds timestamp of its most recent vote.
    recent: std::collections::HashMap<Account, u64>,
    /// Representatives whose weight always counts toward online supply.
    preconfigured: Vec<Account>,
    window_secs: u64,
    /// Minimum online supply (from the `inactive_supply` configuration).
    floor: Amount,
}

impl OnlineReps {
    pub fn new(preconfigured: Vec<Account>, floor: Amount) -> Self {
        Self {
            recent: std::collections::HashMap::new(),
            preconfigured,
            window_secs: DEFAULT_WINDOW_SECS,
            floor,
        }
    }

    pub fn with_window(mut self, window_secs: u64) -> Self {
        self.window_secs = window_secs;
        self
    }

    /// Record that a representative voted at `now_secs`. Stale observations
    /// never move the timestamp backwards.
    pub fn observe(&mut self, representative: Account, now_secs: u64) {
        let entry = self.recent.entry(representative).or_insert(0);
        if now_secs > *entry {
            *entry = now_secs;
        }
    }

    /// Sum of ledger weight over online representatives (recent voters plus
    /// preconfigured), floored by the configured inactive supply.
    pub fn online_weight(&self, ledger: &dyn Ledger, now_secs: u64) -> Amount {
        let cutoff = now_secs.saturating_sub(self.window_secs);
        let mut online: HashSet<Account> = self
            .recent
            .iter()
            .filter(|(_, &last)| last >= cutoff)
            .map(|(account, _)| *account)
            .collect();
        online.extend(self.preconfigured.iter().copied());

        let measured: Amount = online.iter().map(|rep| ledger.weight(rep)).sum();
        if measured < self.floor {
            self.floor
        } else {
            measured
        }
    }

    /// Strict majority of online supply.
    pub fn quorum_threshold(&self, ledger: &dyn Ledger, now_secs: u64) -> Amount {
        self.online_weight(ledger, now_secs)
            .div(2)
            .saturating_add(Amount::new(1))
    }

    /// Vote weight at which an orphaned block justifies a bootstrap.
    pub fn bootstrap_threshold(
        &self,
        ledger: &dyn Ledger,
        now_secs: u64,
        fraction_numerator: u64,
    ) -> Amount {
        self.online_weight(ledger, now_secs)
            .div(fraction_numerator as u128)
    }

    /// Drop representatives that fell out of the window.
    pub fn prune(&mut self, now_secs: u64) {
        let cutoff = now_secs.saturating_sub(self.window_secs);
        self.recent.retain(|_, &mut last| last >= cutoff);
    }

    pub fn tracked(&self) -> usize {
        self.recent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_nullables::{NullClock, NullLedger};

    fn rep(byte: u8) -> Account {
        Account::new([byte; 32])
    }

    #[test]
    fn recent_voters_count() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(100));
        ledger.set_weight(rep(2), Amount::new(200));

        let mut reps = OnlineReps::new(Vec::new(), Amount::ZERO);
        reps.observe(rep(1), 1000);
        reps.observe(rep(2), 1000);

        assert_eq!(reps.online_weight(&ledger, 1100), Amount::new(300));
    }

    #[test]
    fn stale_voters_fall_out_of_window() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(100));
        ledger.set_weight(rep(2), Amount::new(200));

        let clock = NullClock::starting_at(500);
        let mut reps = OnlineReps::new(Vec::new(), Amount::ZERO);
        reps.observe(rep(1), clock.now_secs());
        clock.tick(400);
        reps.observe(rep(2), clock.now_secs());
        clock.tick(100);

        // rep 1 last voted 500s ago, past the 300s window; rep 2 is 100s old.
        assert_eq!(
            reps.online_weight(&ledger, clock.now_secs()),
            Amount::new(200)
        );
    }

    #[test]
    fn preconfigured_reps_count_while_quiet() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(7), Amount::new(500));

        let reps = OnlineReps::new(vec![rep(7)], Amount::ZERO);
        assert_eq!(reps.online_weight(&ledger, 1000), Amount::new(500));
    }

    #[test]
    fn preconfigured_rep_not_double_counted() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(7), Amount::new(500));

        let mut reps = OnlineReps::new(vec![rep(7)], Amount::ZERO);
        reps.observe(rep(7), 1000);
        assert_eq!(reps.online_weight(&ledger, 1000), Amount::new(500));
    }

    #[test]
    fn floor_applies_when_nothing_observed() {
        let ledger = NullLedger::new();
        let reps = OnlineReps::new(Vec::new(), Amount::new(10_000));
        assert_eq!(reps.online_weight(&ledger, 1000), Amount::new(10_000));
    }

    #[test]
    fn quorum_is_majority_plus_one() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(100));

        let mut reps = OnlineReps::new(Vec::new(), Amount::ZERO);
        reps.observe(rep(1), 1000);

        assert_eq!(reps.quorum_threshold(&ledger, 1000), Amount::new(51));
    }

    #[test]
    fn bootstrap_threshold_is_a_fraction() {
        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(1600));

        let mut reps = OnlineReps::new(Vec::new(), Amount::ZERO);
        reps.observe(rep(1), 1000);

        assert_eq!(
            reps.bootstrap_threshold(&ledger, 1000, 16),
            Amount::new(100)
        );
    }

    #[test]
    fn observe_never_rewinds() {
        let mut reps = OnlineReps::new(Vec::new(), Amount::ZERO);
        reps.observe(rep(1), 900);
        reps.observe(rep(1), 500);

        let ledger = NullLedger::new();
        ledger.set_weight(rep(1), Amount::new(10));
        // Still online thanks to the 900 observation.
        assert_eq!(reps.online_weight(&ledger, 1100), Amount::new(10));
    }

    #[test]
    fn prune_drops_stale_entries() {
        let mut reps = OnlineReps::new(Vec::new(), Amount::ZERO);
        reps.observe(rep(1), 500);
        reps.observe(rep(2), 900);
        reps.prune(1000);
        assert_eq!(reps.tracked(), 1);
    }
}
