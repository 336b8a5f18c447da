//! Observer fan-out: append-only handler lists registered at startup.
//!
//! Handlers run on the thread that emitted the event and must not re-enter
//! the emitting component. Emitting components never hold their own lock
//! while notifying.

use std::net::SocketAddr;
use std::sync::RwLock;
use strand_types::{Block, Vote};

type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A multicast of handlers for one event type.
pub struct ObserverSet<T> {
    handlers: RwLock<Vec<Handler<T>>>,
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }
}

impl<T> ObserverSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        self.handlers
            .write()
            .expect("observer list poisoned")
            .push(Box::new(handler));
    }

    pub fn notify(&self, event: &T) {
        for handler in self
            .handlers
            .read()
            .expect("observer list poisoned")
            .iter()
        {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.read().expect("observer list poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The node's observer surface, wired once at startup.
#[derive(Default)]
pub struct NodeObservers {
    /// A block reached confirmation.
    pub blocks: ObserverSet<Block>,
    /// A valid vote arrived.
    pub vote: ObserverSet<Vote>,
    /// A previously unknown endpoint made contact.
    pub endpoint: ObserverSet<SocketAddr>,
    /// The last peer was purged.
    pub disconnect: ObserverSet<()>,
    /// A gapped block accumulated enough vote weight; fetch from this peer.
    pub bootstrap: ObserverSet<SocketAddr>,
}

impl NodeObservers {
    pub fn new() -> Self {
        Self::default()
    }
}
