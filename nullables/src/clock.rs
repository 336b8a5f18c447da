//! A clock under test control.
//!
//! Production code reads the wall clock in exactly one place and passes
//! `now_secs` values down into the containers. Tests substitute this clock as
//! the source of those values: it starts at an arbitrary epoch and moves only
//! when the test says so, which makes timeout and purge behavior exactly
//! reproducible.

use std::sync::atomic::{AtomicU64, Ordering};

pub struct NullClock {
    reading_secs: AtomicU64,
}

impl NullClock {
    /// A clock whose first reading is `start_secs`.
    pub fn starting_at(start_secs: u64) -> Self {
        Self {
            reading_secs: AtomicU64::new(start_secs),
        }
    }

    /// The instant the clock currently reports.
    pub fn now_secs(&self) -> u64 {
        self.reading_secs.load(Ordering::SeqCst)
    }

    /// Move forward by `secs` and return the new reading.
    pub fn tick(&self, secs: u64) -> u64 {
        self.reading_secs.fetch_add(secs, Ordering::SeqCst) + secs
    }

    /// Jump to an absolute reading (forwards or backwards).
    pub fn warp_to(&self, secs: u64) {
        self.reading_secs.store(secs, Ordering::SeqCst);
    }
}
