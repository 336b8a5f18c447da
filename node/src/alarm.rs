//! Deferred execution: a monotonic timer queue serviced by one worker thread.
//!
//! `add(when, action)` enqueues an action to run no earlier than `when`. The
//! worker sleeps on a condition variable until the earliest wakeup, fires all
//! due actions in wakeup order (ties broken by insertion order), and
//! re-sleeps. `stop` discards pending actions without executing them and
//! joins the worker.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

type Action = Box<dyn FnOnce() + Send>;

struct Operation {
    wakeup: Instant,
    /// Insertion order, the tie-break for equal wakeups.
    seq: u64,
    action: Action,
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.wakeup == other.wakeup && self.seq == other.seq
    }
}

impl Eq for Operation {}

impl PartialOrd for Operation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Operation {
    // Reversed so the std max-heap pops the earliest (wakeup, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.wakeup, other.seq).cmp(&(self.wakeup, self.seq))
    }
}

struct State {
    operations: BinaryHeap<Operation>,
    next_seq: u64,
    stopped: bool,
}

struct Shared {
    state: Mutex<State>,
    condition: Condvar,
}

/// The timer queue. Cheap to share; `add` may be called from any thread,
/// including from inside a firing action.
pub struct Alarm {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Alarm {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                operations: BinaryHeap::new(),
                next_seq: 0,
                stopped: false,
            }),
            condition: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("alarm".into())
            .spawn(move || run(&worker_shared))
            .expect("failed to spawn alarm worker");
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue `action` to run no earlier than `wakeup`. Actions added after
    /// `stop` are discarded.
    pub fn add(&self, wakeup: Instant, action: impl FnOnce() + Send + 'static) {
        let mut state = self.shared.state.lock().expect("alarm state poisoned");
        if state.stopped {
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.operations.push(Operation {
            wakeup,
            seq,
            action: Box::new(action),
        });
        self.shared.condition.notify_one();
    }

    /// Number of pending operations.
    pub fn pending(&self) -> usize {
        self.shared
            .state
            .lock()
            .expect("alarm state poisoned")
            .operations
            .len()
    }

    /// Discard pending actions without executing them and join the worker.
    /// Idempotent.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock().expect("alarm state poisoned");
            state.stopped = true;
            state.operations.clear();
        }
        self.shared.condition.notify_all();
        let worker = self.worker.lock().expect("alarm worker poisoned").take();
        if let Some(worker) = worker {
            // An action dropping the last alarm handle would stop from the
            // worker itself; joining there would never return.
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl Default for Alarm {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: &Shared) {
    let mut state = shared.state.lock().expect("alarm state poisoned");
    loop {
        if state.stopped {
            break;
        }
        let now = Instant::now();
        match state.operations.peek() {
            None => {
                state = shared
                    .condition
                    .wait(state)
                    .expect("alarm state poisoned");
            }
            Some(operation) if operation.wakeup <= now => {
                let operation = state
                    .operations
                    .pop()
                    .expect("peeked operation disappeared");
                // Fire without holding the queue lock so the action may
                // re-enter `add`.
                drop(state);
                (operation.action)();
                state = shared.state.lock().expect("alarm state poisoned");
            }
            Some(operation) => {
                let wait = operation.wakeup - now;
                let (next, _) = shared
                    .condition
                    .wait_timeout(state, wait)
                    .expect("alarm state poisoned");
                state = next;
            }
        }
    }
}
