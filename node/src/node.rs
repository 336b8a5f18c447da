//! The node facade: wires the alarm, peer container, UDP network, gap cache,
//! and active elections together, and dispatches inbound messages.

use crate::alarm::Alarm;
use crate::config::{NodeConfig, KEEPALIVE_CUTOFF_SECS, KEEPALIVE_PERIOD_SECS};
use crate::error::NodeError;
use crate::observers::NodeObservers;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use strand_consensus::{ActiveElections, GapCache, OnlineReps, VoteGenerator};
use strand_crypto::verify_vote;
use strand_ledger::{Ledger, ProcessResult};
use strand_messages::Message;
use strand_network::{Endpoint, MessageSink, NetworkStats, PeerContainer, UdpNetwork};
use strand_types::time::unix_now_secs;
use strand_types::work::work_valid;
use strand_types::{Block, KeyPair, Vote};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Result of initializing the external collaborators a node is built on.
/// Each flag is set when the corresponding facility failed to open; a caller
/// observing [`error`](Self::error) must not construct the node.
#[derive(Default)]
pub struct NodeInit {
    pub block_store_init: bool,
    pub wallet_init: bool,
}

impl NodeInit {
    pub fn error(&self) -> bool {
        self.block_store_init || self.wallet_init
    }
}

/// A running strand node.
pub struct Node {
    pub config: NodeConfig,
    pub ledger: Arc<dyn Ledger>,
    pub alarm: Arc<Alarm>,
    pub peers: Arc<PeerContainer>,
    pub network: Arc<UdpNetwork>,
    pub observers: Arc<NodeObservers>,

    active: Mutex<ActiveElections>,
    gap_cache: Mutex<GapCache>,
    online_reps: Mutex<OnlineReps>,
    /// Vote generators for wallet-held representatives. One sequence stream
    /// per representative, shared by the announcement sweep and confirm_req
    /// answering.
    local_reps: Mutex<Vec<VoteGenerator>>,

    shutdown: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    self_weak: Weak<Node>,
    on: AtomicBool,
}

impl Node {
    /// Bind the socket and assemble the subsystems. `local_rep_keys` are the
    /// wallet-held representative keys this node votes with.
    pub async fn new(
        config: NodeConfig,
        ledger: Arc<dyn Ledger>,
        local_rep_keys: Vec<KeyPair>,
    ) -> Result<Arc<Self>, NodeError> {
        let self_endpoint = SocketAddr::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            config.peering_port,
        );
        let peers = Arc::new(PeerContainer::new(self_endpoint));
        let stats = Arc::new(NetworkStats::new());
        let network = UdpNetwork::bind(
            config.network,
            self_endpoint,
            Arc::clone(&peers),
            stats,
            Duration::from_micros(config.packet_delay_microseconds),
        )
        .await?;

        let online_reps = OnlineReps::new(
            config.preconfigured_representatives.clone(),
            config.inactive_supply,
        );
        let local_reps = local_rep_keys.into_iter().map(VoteGenerator::new).collect();
        let (shutdown, _) = broadcast::channel(4);

        let node = Arc::new_cyclic(|self_weak: &Weak<Node>| Node {
            config,
            ledger,
            alarm: Arc::new(Alarm::new()),
            peers,
            network,
            observers: Arc::new(NodeObservers::new()),
            active: Mutex::new(ActiveElections::new()),
            gap_cache: Mutex::new(GapCache::default()),
            online_reps: Mutex::new(online_reps),
            local_reps: Mutex::new(local_reps),
            shutdown,
            handles: Mutex::new(Vec::new()),
            self_weak: self_weak.clone(),
            on: AtomicBool::new(true),
        });

        // New peers get an immediate keepalive and are surfaced to the
        // endpoint observers.
        {
            let weak = node.self_weak.clone();
            node.peers.on_peer(move |endpoint| {
                if let Some(node) = weak.upgrade() {
                    node.network.send_keepalive(endpoint);
                    node.observers.endpoint.notify(&endpoint);
                }
            });
            let weak = node.self_weak.clone();
            node.peers.on_disconnect(move || {
                if let Some(node) = weak.upgrade() {
                    tracing::warn!("no peers remaining");
                    node.observers.disconnect.notify(&());
                }
            });
        }

        Ok(node)
    }

    /// Start the I/O loops and the periodic schedules.
    pub fn start(self: &Arc<Self>) {
        if self.config.logging.node_lifetime_tracing {
            tracing::info!(
                port = self.network.local_endpoint().port(),
                network = self.config.network.as_str(),
                "node starting"
            );
        }
        let sink: Arc<dyn MessageSink> = Arc::clone(self) as Arc<dyn MessageSink>;
        let mut handles = self.network.start(sink, &self.shutdown);
        self.handles
            .lock()
            .expect("task handle list poisoned")
            .append(&mut handles);

        self.keepalive_preconfigured();
        self.ongoing_keepalive();
        self.schedule_announcements();
    }

    /// Cooperative shutdown: stop accepting and issuing I/O, discard pending
    /// alarm work, signal every task.
    pub fn stop(&self) {
        if !self.on.swap(false, Ordering::SeqCst) {
            return;
        }
        if self.config.logging.node_lifetime_tracing {
            tracing::info!("node stopping");
        }
        self.network.stop();
        let _ = self.shutdown.send(());
        self.alarm.stop();
    }

    /// Await the spawned I/O tasks after [`stop`](Self::stop).
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().expect("task handle list poisoned");
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    /// The number of live elections.
    pub fn active_count(&self) -> usize {
        self.active.lock().expect("active elections poisoned").len()
    }

    /// The number of buffered orphan blocks.
    pub fn gap_count(&self) -> usize {
        self.gap_cache.lock().expect("gap cache poisoned").len()
    }

    /// Whether an election is live for this block's root.
    pub fn election_active(&self, block: &Block) -> bool {
        self.active
            .lock()
            .expect("active elections poisoned")
            .active(block)
    }

    // ── Block intake ──────────────────────────────────────────────────

    /// Process an inbound block, replaying any gap-cache dependents that its
    /// acceptance unblocks.
    pub fn process_active(&self, block: Block, rebroadcast: u32, now_secs: u64) {
        let mut queue = VecDeque::new();
        queue.push_back(block);
        while let Some(current) = queue.pop_front() {
            let hash = current.hash();
            let result = self.process_receive_one(current, rebroadcast, now_secs);
            if result == ProcessResult::Progress {
                let dependents = {
                    let mut gap_cache = self.gap_cache.lock().expect("gap cache poisoned");
                    gap_cache.get(&hash)
                };
                queue.extend(dependents);
            }
        }
    }

    fn process_receive_one(&self, block: Block, rebroadcast: u32, now_secs: u64) -> ProcessResult {
        let hash = block.hash();
        let result = self.ledger.process(&block);
        match result {
            ProcessResult::Progress => {
                if self.config.logging.ledger_logging {
                    tracing::debug!(%hash, "block processed");
                }
                self.republish(block, rebroadcast);
            }
            ProcessResult::GapPrevious => {
                let required = block.previous().unwrap_or_else(|| block.root());
                tracing::debug!(%hash, %required, "gap previous");
                self.gap_cache
                    .lock()
                    .expect("gap cache poisoned")
                    .add(block, required);
            }
            ProcessResult::GapSource => {
                let required = block.source().unwrap_or_else(|| block.root());
                tracing::debug!(%hash, %required, "gap source");
                self.gap_cache
                    .lock()
                    .expect("gap cache poisoned")
                    .add(block, required);
            }
            ProcessResult::Fork => {
                tracing::info!(%hash, root = %block.root(), "fork, starting election");
                // The election opens on the ledger's version of the slot, so
                // an unaccepted fork can never settle by cutoff; the incoming
                // block only wins by out-voting ours.
                let ours = self
                    .ledger
                    .successor(&block.root())
                    .unwrap_or_else(|| block.clone());
                let started = {
                    let weak = self.self_weak.clone();
                    let mut local_reps =
                        self.local_reps.lock().expect("vote generators poisoned");
                    let mut active = self.active.lock().expect("active elections poisoned");
                    active.start(&ours, self.ledger.as_ref(), &mut local_reps, now_secs, {
                        move |winner| {
                            if let Some(node) = weak.upgrade() {
                                node.process_confirmed(winner);
                            }
                        }
                    })
                };
                if started {
                    self.network.broadcast_confirm_req(&block);
                }
            }
            ProcessResult::Old => {
                if self.config.logging.ledger_duplicate_logging {
                    tracing::debug!(%hash, "old block");
                }
            }
            ProcessResult::BadSignature
            | ProcessResult::NegativeSpend
            | ProcessResult::Unreceivable
            | ProcessResult::NotReceiveFromSend => {
                tracing::debug!(%hash, ?result, "block rejected");
            }
        }
        result
    }

    /// Publish `block` to peers that have not seen it, then schedule the next
    /// wave with a decremented counter. A zero count suppresses the wave.
    pub fn republish(&self, block: Block, rebroadcast: u32) {
        self.network.republish_block(&block, rebroadcast);
        if rebroadcast > 1 {
            let weak = self.self_weak.clone();
            let delay = Duration::from_millis(self.config.rebroadcast_delay_ms);
            self.alarm.add(Instant::now() + delay, move || {
                if let Some(node) = weak.upgrade() {
                    node.republish(block, rebroadcast - 1);
                }
            });
        }
    }

    // ── Vote intake ───────────────────────────────────────────────────

    /// Feed a validated vote to the online-supply tracker, the election for
    /// its root, and the gap cache.
    pub fn vote(&self, vote: Vote, from: Endpoint, now_secs: u64) {
        self.observers.vote.notify(&vote);

        let (quorum, bootstrap_threshold) = {
            let mut online = self.online_reps.lock().expect("online reps poisoned");
            online.observe(vote.account, now_secs);
            (
                online.quorum_threshold(self.ledger.as_ref(), now_secs),
                online.bootstrap_threshold(
                    self.ledger.as_ref(),
                    now_secs,
                    self.config.bootstrap_fraction_numerator,
                ),
            )
        };

        let action = {
            let mut active = self.active.lock().expect("active elections poisoned");
            active.vote(vote.clone(), self.ledger.as_ref(), quorum, now_secs)
        };
        if let Some(action) = action {
            if let Some(winner) = action.broadcast {
                self.republish(winner, self.config.creation_rebroadcast);
            }
            if let Some(confirmation) = action.confirmation {
                confirmation.fire();
            }
        }

        let bootstrap_from = {
            let mut gap_cache = self.gap_cache.lock().expect("gap cache poisoned");
            gap_cache.vote(&vote, self.ledger.as_ref(), bootstrap_threshold, from)
        };
        if let Some(source) = bootstrap_from {
            tracing::info!(%source, "initiating bootstrap for gapped block");
            self.observers.bootstrap.notify(&source);
        }
    }

    // ── Confirmation ──────────────────────────────────────────────────

    /// Answer a confirm_req: when the ledger holds a successor for the
    /// requested root, each local representative signs a vote for it, sent
    /// back to the requester as confirm_acks. An unknown root is treated as
    /// a fresh publish.
    pub fn process_confirmation(&self, block: Block, from: Endpoint, now_secs: u64) {
        match self.ledger.successor(&block.root()) {
            Some(successor) => {
                let votes: Vec<Vote> = {
                    let mut local_reps =
                        self.local_reps.lock().expect("vote generators poisoned");
                    local_reps
                        .iter_mut()
                        .map(|rep| rep.generate(&successor))
                        .collect()
                };
                for vote in votes {
                    self.network.confirm_block(vote, from);
                }
            }
            None => self.process_active(block, self.config.creation_rebroadcast, now_secs),
        }
    }

    /// The confirmation action installed on every election.
    fn process_confirmed(&self, winner: Block) {
        let hash = winner.hash();
        let account = self.ledger.block_account(&hash);
        tracing::info!(%hash, account = ?account, "block confirmed");
        self.observers.blocks.notify(&winner);
    }

    // ── Periodic work ─────────────────────────────────────────────────

    /// One announcement sweep over the active elections; reschedules itself
    /// through the alarm while the node runs.
    pub fn announce_votes(&self) {
        let now_secs = unix_now_secs();
        let quorum = {
            let online = self.online_reps.lock().expect("online reps poisoned");
            online.quorum_threshold(self.ledger.as_ref(), now_secs)
        };
        let outcome = {
            let mut local_reps = self.local_reps.lock().expect("vote generators poisoned");
            let mut active = self.active.lock().expect("active elections poisoned");
            active.announce_votes(self.ledger.as_ref(), &mut local_reps, quorum, now_secs)
        };
        for confirmation in outcome.confirmations {
            confirmation.fire();
        }
        for winner in outcome.broadcasts {
            self.republish(winner, self.config.creation_rebroadcast);
        }
    }

    fn schedule_announcements(self: &Arc<Self>) {
        let weak = self.self_weak.clone();
        self.alarm
            .add(Instant::now() + self.config.announce_interval(), move || {
                if let Some(node) = weak.upgrade() {
                    if node.is_running() {
                        node.announce_votes();
                        node.schedule_announcements();
                    }
                }
            });
    }

    /// Purge stale peers and keepalive the quiet ones; reschedules itself
    /// once per keepalive period.
    fn ongoing_keepalive(self: &Arc<Self>) {
        let now_secs = unix_now_secs();
        self.peers
            .purge_list(now_secs.saturating_sub(KEEPALIVE_CUTOFF_SECS));
        for peer in self.peers.list() {
            if peer.last_attempt_secs + KEEPALIVE_PERIOD_SECS / 2 <= now_secs {
                if self.config.logging.network_keepalive_logging {
                    tracing::debug!(endpoint = %peer.endpoint, "keepalive");
                }
                self.network.send_keepalive(peer.endpoint);
            }
        }
        let weak = self.self_weak.clone();
        self.alarm.add(
            Instant::now() + Duration::from_secs(KEEPALIVE_PERIOD_SECS),
            move || {
                if let Some(node) = weak.upgrade() {
                    if node.is_running() {
                        node.ongoing_keepalive();
                    }
                }
            },
        );
    }

    /// Resolve the configured peer hostnames and contact each address.
    fn keepalive_preconfigured(self: &Arc<Self>) {
        if self.config.preconfigured_peers.is_empty() {
            return;
        }
        let hosts = self.config.preconfigured_peers.clone();
        let port = self.config.network.default_port();
        let network = Arc::clone(&self.network);
        let handle = tokio::spawn(async move {
            for host in hosts {
                match tokio::net::lookup_host((host.as_str(), port)).await {
                    Ok(addresses) => {
                        for address in addresses {
                            network.send_keepalive(address);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%host, %error, "preconfigured peer resolution failed");
                    }
                }
            }
        });
        self.handles
            .lock()
            .expect("task handle list poisoned")
            .push(handle);
    }

    /// Contact a peer by hostname.
    pub async fn keepalive(&self, host: &str, port: u16) -> Result<(), NodeError> {
        let addresses = tokio::net::lookup_host((host, port)).await?;
        for address in addresses {
            self.network.send_keepalive(address);
        }
        Ok(())
    }

    /// Every inbound block carries a work nonce, whether it rode a publish,
    /// a confirm_req, or a vote. A nonce below the network threshold drops
    /// the message here, before any subsystem sees the block.
    fn work_ok(&self, block: &Block, from: Endpoint) -> bool {
        if work_valid(self.config.network, &block.root(), block.work()) {
            return true;
        }
        self.network.stats().inc_insufficient_work();
        if self.config.logging.insufficient_work_logging {
            tracing::debug!(hash = %block.hash(), %from, "insufficient work");
        }
        false
    }
}

impl MessageSink for Node {
    fn receive(&self, message: Message, from: Endpoint) {
        if !self.is_running() {
            return;
        }
        let now_secs = unix_now_secs();
        if self.config.logging.network_message_logging {
            tracing::debug!(kind = ?message.kind(), %from, "message received");
        }
        match message {
            Message::Keepalive(endpoints) => {
                self.peers.contacted(from, now_secs);
                self.network.merge_peers(&endpoints);
            }
            Message::Publish(block) => {
                if !self.work_ok(&block, from) {
                    return;
                }
                if self.config.logging.network_publish_logging {
                    tracing::debug!(hash = %block.hash(), %from, "publish");
                }
                self.peers.insert_with_hash(from, block.hash(), now_secs);
                self.process_active(block, self.config.creation_rebroadcast, now_secs);
            }
            Message::ConfirmReq(block) => {
                if !self.work_ok(&block, from) {
                    return;
                }
                self.peers.contacted(from, now_secs);
                self.process_confirmation(block, from, now_secs);
            }
            Message::ConfirmAck(vote) => {
                self.peers.contacted(from, now_secs);
                // The voted-for block can end up as an election winner and be
                // republished; it gets the same work gate as a direct publish.
                if !self.work_ok(&vote.block, from) {
                    return;
                }
                if !verify_vote(&vote) {
                    self.network.stats().inc_bad_sender();
                    tracing::debug!(%from, "invalid vote signature");
                    return;
                }
                if self.config.logging.vote_logging {
                    tracing::debug!(
                        representative = %vote.account,
                        sequence = vote.sequence,
                        hash = %vote.block.hash(),
                        "vote"
                    );
                }
                self.vote(vote, from, now_secs);
            }
            Message::BulkPull { start, end } => {
                // Served by the bootstrap listener, which is not part of the
                // gossip core.
                tracing::trace!(%start, %end, %from, "bulk_pull ignored");
            }
        }
    }
}
