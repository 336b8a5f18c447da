//! Transport counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-node message and error counters. All counters are monotone and
/// relaxed; they feed logs and diagnostics, never control flow.
#[derive(Default)]
pub struct NetworkStats {
    keepalive_count: AtomicU64,
    publish_count: AtomicU64,
    confirm_req_count: AtomicU64,
    confirm_ack_count: AtomicU64,
    insufficient_work_count: AtomicU64,
    bad_sender_count: AtomicU64,
    error_count: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl NetworkStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(inc_keepalive, keepalive_count, keepalive_count);
    counter!(inc_publish, publish_count, publish_count);
    counter!(inc_confirm_req, confirm_req_count, confirm_req_count);
    counter!(inc_confirm_ack, confirm_ack_count, confirm_ack_count);
    counter!(inc_insufficient_work, insufficient_work_count, insufficient_work_count);
    counter!(inc_bad_sender, bad_sender_count, bad_sender_count);
    counter!(inc_error, error_count, error_count);
}
