//! Peer membership: liveness timestamps, per-peer block knowledge, and
//! endpoint hygiene.
//!
//! All operations take the container lock; the peer/disconnect observers are
//! invoked after the lock is released so handlers may re-enter the container.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Mutex, RwLock};
use strand_types::BlockHash;

/// A peer address: IP plus UDP port.
pub type Endpoint = SocketAddr;

/// Placeholder endpoint for unfilled keepalive slots.
pub fn unspecified_endpoint() -> Endpoint {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
}

/// Per-peer metadata.
#[derive(Clone, Debug)]
pub struct PeerInfo {
    pub endpoint: Endpoint,
    /// Seconds timestamp of the last valid datagram from this peer.
    pub last_contact_secs: u64,
    /// Seconds timestamp of our last send attempt toward this peer.
    pub last_attempt_secs: u64,
    /// Seconds timestamp of the last failed bootstrap against this peer.
    pub last_bootstrap_failure_secs: u64,
    /// The most recent block hash this peer announced to us. Used to
    /// suppress republishing a block back to its source.
    pub most_recent: BlockHash,
}

impl PeerInfo {
    fn new(endpoint: Endpoint, now_secs: u64) -> Self {
        Self {
            endpoint,
            last_contact_secs: now_secs,
            last_attempt_secs: 0,
            last_bootstrap_failure_secs: 0,
            most_recent: BlockHash::ZERO,
        }
    }
}

type PeerObserver = Box<dyn Fn(Endpoint) + Send + Sync>;
type DisconnectObserver = Box<dyn Fn() + Send + Sync>;

/// The membership table.
pub struct PeerContainer {
    peers: Mutex<HashMap<Endpoint, PeerInfo>>,
    /// Our own listening endpoint; never admitted as a peer.
    self_endpoint: Endpoint,
    /// Fired once per newly observed endpoint, without the container lock.
    peer_observers: RwLock<Vec<PeerObserver>>,
    /// Fired when a purge empties the container, without the container lock.
    disconnect_observers: RwLock<Vec<DisconnectObserver>>,
}

impl PeerContainer {
    pub fn new(self_endpoint: Endpoint) -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
            self_endpoint,
            peer_observers: RwLock::new(Vec::new()),
            disconnect_observers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler for newly observed peers. Handlers are append-only
    /// and must not block.
    pub fn on_peer(&self, observer: impl Fn(Endpoint) + Send + Sync + 'static) {
        self.peer_observers
            .write()
            .expect("peer observer list poisoned")
            .push(Box::new(observer));
    }

    /// Register a handler fired when the last peer is purged.
    pub fn on_disconnect(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.disconnect_observers
            .write()
            .expect("disconnect observer list poisoned")
            .push(Box::new(observer));
    }

    pub fn self_endpoint(&self) -> Endpoint {
        self.self_endpoint
    }

    /// Endpoints that must never enter the membership table: the wildcard
    /// and reserved ranges, multicast, port zero, and our own endpoint.
    pub fn not_a_peer(&self, endpoint: &Endpoint) -> bool {
        if endpoint.port() == 0 || *endpoint == self.self_endpoint {
            return true;
        }
        match canonical_ip(endpoint.ip()) {
            IpAddr::V4(v4) => {
                let octets = v4.octets();
                v4.is_unspecified() || v4.is_multicast() || octets[0] == 0 || octets[0] >= 240
            }
            IpAddr::V6(v6) => v6.is_unspecified() || v6.is_multicast(),
        }
    }

    /// We were contacted by `endpoint`: upsert its liveness. A previously
    /// unknown endpoint fires the peer observers.
    pub fn contacted(&self, endpoint: Endpoint, now_secs: u64) {
        self.insert(endpoint, now_secs);
    }

    pub fn known_peer(&self, endpoint: &Endpoint) -> bool {
        self.peers
            .lock()
            .expect("peer table poisoned")
            .contains_key(endpoint)
    }

    /// Upsert a peer, refreshing `last_contact`. Returns `true` iff the
    /// endpoint was already known (callers use this to decide whether to
    /// answer with a keepalive). Rejected endpoints count as known.
    pub fn insert(&self, endpoint: Endpoint, now_secs: u64) -> bool {
        if self.not_a_peer(&endpoint) {
            tracing::trace!(%endpoint, "rejected non-peer endpoint");
            return true;
        }
        let was_known = {
            let mut peers = self.peers.lock().expect("peer table poisoned");
            match peers.get_mut(&endpoint) {
                Some(info) => {
                    info.last_contact_secs = now_secs;
                    true
                }
                None => {
                    peers.insert(endpoint, PeerInfo::new(endpoint, now_secs));
                    false
                }
            }
        };
        if !was_known {
            tracing::debug!(%endpoint, "new peer");
            for observer in self
                .peer_observers
                .read()
                .expect("peer observer list poisoned")
                .iter()
            {
                observer(endpoint);
            }
        }
        was_known
    }

    /// Upsert a peer that announced `hash` to us, recording the announcement
    /// in `most_recent`.
    pub fn insert_with_hash(&self, endpoint: Endpoint, hash: BlockHash, now_secs: u64) -> bool {
        let was_known = self.insert(endpoint, now_secs);
        let mut peers = self.peers.lock().expect("peer table poisoned");
        if let Some(info) = peers.get_mut(&endpoint) {
            info.most_recent = hash;
        }
        was_known
    }

    /// Does this peer probably already have this block?
    pub fn knows_about(&self, endpoint: &Endpoint, hash: &BlockHash) -> bool {
        self.peers
            .lock()
            .expect("peer table poisoned")
            .get(endpoint)
            .map(|info| info.most_recent == *hash)
            .unwrap_or(false)
    }

    /// Record a send attempt toward `endpoint`.
    pub fn attempted(&self, endpoint: &Endpoint, now_secs: u64) {
        let mut peers = self.peers.lock().expect("peer table poisoned");
        if let Some(info) = peers.get_mut(endpoint) {
            info.last_attempt_secs = now_secs;
        }
    }

    /// Record a failed bootstrap against `endpoint`.
    pub fn bootstrap_failed(&self, endpoint: &Endpoint, now_secs: u64) {
        let mut peers = self.peers.lock().expect("peer table poisoned");
        if let Some(info) = peers.get_mut(endpoint) {
            info.last_bootstrap_failure_secs = now_secs;
        }
    }

    /// Fill `out` with up to 8 distinct random peers; remaining slots keep
    /// the unspecified placeholder.
    pub fn random_fill(&self, out: &mut [Endpoint; 8]) {
        out.fill(unspecified_endpoint());
        let mut endpoints: Vec<Endpoint> = {
            let peers = self.peers.lock().expect("peer table poisoned");
            peers.keys().copied().collect()
        };
        endpoints.shuffle(&mut rand::thread_rng());
        for (slot, endpoint) in out.iter_mut().zip(endpoints) {
            *slot = endpoint;
        }
    }

    /// Snapshot of all peers.
    pub fn list(&self) -> Vec<PeerInfo> {
        self.peers
            .lock()
            .expect("peer table poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Peers whose last bootstrap failure is older than `cooldown_secs`.
    pub fn bootstrap_candidates(&self, now_secs: u64, cooldown_secs: u64) -> Vec<PeerInfo> {
        let cutoff = now_secs.saturating_sub(cooldown_secs);
        self.peers
            .lock()
            .expect("peer table poisoned")
            .values()
            .filter(|info| info.last_bootstrap_failure_secs < cutoff)
            .cloned()
            .collect()
    }

    /// Remove and return every peer with `last_contact < cutoff_secs`. When
    /// the purge empties the container the disconnect observers fire.
    pub fn purge_list(&self, cutoff_secs: u64) -> Vec<PeerInfo> {
        let (purged, now_empty) = {
            let mut peers = self.peers.lock().expect("peer table poisoned");
            let stale: Vec<Endpoint> = peers
                .values()
                .filter(|info| info.last_contact_secs < cutoff_secs)
                .map(|info| info.endpoint)
                .collect();
            let purged: Vec<PeerInfo> = stale
                .iter()
                .filter_map(|endpoint| peers.remove(endpoint))
                .collect();
            (purged, peers.is_empty())
        };
        if !purged.is_empty() {
            tracing::debug!(count = purged.len(), "purged stale peers");
        }
        if now_empty && !purged.is_empty() {
            for observer in self
                .disconnect_observers
                .read()
                .expect("disconnect observer list poisoned")
                .iter()
            {
                observer();
            }
        }
        purged
    }

    pub fn size(&self) -> usize {
        self.peers.lock().expect("peer table poisoned").len()
    }

    pub fn empty(&self) -> bool {
        self.size() == 0
    }
}

/// Unmap v4-mapped IPv6 addresses so range checks see the real v4 address.
fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}
