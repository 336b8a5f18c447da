//! The UDP socket: receive loop, serialized sends, gossip fan-out.
//!
//! All outbound datagrams flow through one FIFO queue drained by a single
//! sender task, so per-socket sends reach the kernel in enqueue order and the
//! socket handle is never written concurrently. The receive loop posts one
//! 512-byte receive at a time and hands decoded messages to the node's
//! [`MessageSink`]; malformed datagrams only bump `bad_sender_count`.

use crate::peer_container::{unspecified_endpoint, Endpoint, PeerContainer};
use crate::stats::NetworkStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strand_messages::{Message, MessageKind, WireEndpoint, KEEPALIVE_PEERS};
use strand_types::time::unix_now_secs;
use strand_types::{Block, NetworkId, Vote};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Receive buffer size; larger datagrams are truncated and fail decode.
const RECEIVE_BUFFER: usize = 512;
/// Outbound queue depth. Entries beyond this are dropped and counted.
const SEND_QUEUE_DEPTH: usize = 4096;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("socket bind failed: {0}")]
    Bind(#[from] std::io::Error),
}

/// Where decoded inbound messages go; the node facade implements this.
pub trait MessageSink: Send + Sync {
    fn receive(&self, message: Message, from: Endpoint);
}

struct SendEntry {
    bytes: Vec<u8>,
    endpoint: Endpoint,
}

/// The gossip transport bound to one UDP socket.
pub struct UdpNetwork {
    socket: Arc<UdpSocket>,
    network_id: NetworkId,
    local: Endpoint,
    peers: Arc<PeerContainer>,
    stats: Arc<NetworkStats>,
    send_tx: mpsc::Sender<SendEntry>,
    /// Taken by `start`; present only before the sender task runs.
    send_rx: Mutex<Option<mpsc::Receiver<SendEntry>>>,
    /// Pacing between outbound datagrams.
    packet_delay: Duration,
    on: AtomicBool,
}

impl UdpNetwork {
    /// Bind the socket and prepare the send queue. Call [`start`](Self::start)
    /// to spawn the I/O tasks.
    pub async fn bind(
        network_id: NetworkId,
        bind_addr: Endpoint,
        peers: Arc<PeerContainer>,
        stats: Arc<NetworkStats>,
        packet_delay: Duration,
    ) -> Result<Arc<Self>, NetworkError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        let local = socket.local_addr()?;
        let (send_tx, send_rx) = mpsc::channel(SEND_QUEUE_DEPTH);
        tracing::info!(%local, network = network_id.as_str(), "UDP socket bound");
        Ok(Arc::new(Self {
            socket: Arc::new(socket),
            network_id,
            local,
            peers,
            stats,
            send_tx,
            send_rx: Mutex::new(Some(send_rx)),
            packet_delay,
            on: AtomicBool::new(true),
        }))
    }

    pub fn local_endpoint(&self) -> Endpoint {
        self.local
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Spawn the receive loop and the sender task. Idempotent: a second call
    /// returns no handles.
    pub fn start(
        self: &Arc<Self>,
        sink: Arc<dyn MessageSink>,
        shutdown: &broadcast::Sender<()>,
    ) -> Vec<JoinHandle<()>> {
        let Some(send_rx) = self.send_rx.lock().expect("send queue poisoned").take() else {
            return Vec::new();
        };
        let recv_handle = tokio::spawn(Arc::clone(self).receive_loop(sink, shutdown.subscribe()));
        let send_handle = tokio::spawn(Arc::clone(self).send_loop(send_rx, shutdown.subscribe()));
        vec![recv_handle, send_handle]
    }

    /// Stop issuing and accepting I/O. Queued sends are discarded by the
    /// sender task when the shutdown signal lands.
    pub fn stop(&self) {
        self.on.store(false, Ordering::SeqCst);
    }

    async fn receive_loop(
        self: Arc<Self>,
        sink: Arc<dyn MessageSink>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut buffer = [0u8; RECEIVE_BUFFER];
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                received = self.socket.recv_from(&mut buffer) => {
                    if !self.on.load(Ordering::SeqCst) {
                        break;
                    }
                    match received {
                        Ok((len, from)) => self.dispatch(&buffer[..len], from, sink.as_ref()),
                        Err(error) => {
                            self.stats.inc_error();
                            tracing::debug!(%error, "receive failed");
                        }
                    }
                }
            }
        }
        tracing::debug!("receive loop stopped");
    }

    fn dispatch(&self, bytes: &[u8], from: Endpoint, sink: &dyn MessageSink) {
        match strand_messages::decode(self.network_id, bytes) {
            Ok(message) => {
                match message.kind() {
                    MessageKind::Keepalive => self.stats.inc_keepalive(),
                    MessageKind::Publish => self.stats.inc_publish(),
                    MessageKind::ConfirmReq => self.stats.inc_confirm_req(),
                    MessageKind::ConfirmAck => self.stats.inc_confirm_ack(),
                    MessageKind::BulkPull => {}
                }
                sink.receive(message, from);
            }
            Err(error) => {
                self.stats.inc_bad_sender();
                tracing::debug!(%from, %error, "dropping malformed datagram");
            }
        }
    }

    async fn send_loop(
        self: Arc<Self>,
        mut send_rx: mpsc::Receiver<SendEntry>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                entry = send_rx.recv() => {
                    let Some(entry) = entry else { break };
                    if !self.on.load(Ordering::SeqCst) {
                        continue;
                    }
                    if let Err(error) = self.socket.send_to(&entry.bytes, entry.endpoint).await {
                        self.stats.inc_error();
                        tracing::debug!(endpoint = %entry.endpoint, %error, "send failed");
                    }
                    if !self.packet_delay.is_zero() {
                        tokio::time::sleep(self.packet_delay).await;
                    }
                }
            }
        }
        tracing::debug!("send queue stopped");
    }

    /// Enqueue a datagram. A full queue or an encode failure drops the
    /// message and counts an error; the caller never blocks.
    fn send(&self, message: &Message, endpoint: Endpoint) {
        let bytes = match strand_messages::encode(self.network_id, message) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.stats.inc_error();
                tracing::warn!(%error, "message encode failed");
                return;
            }
        };
        if self
            .send_tx
            .try_send(SendEntry { bytes, endpoint })
            .is_err()
        {
            self.stats.inc_error();
            tracing::debug!(%endpoint, "send queue full, datagram dropped");
        }
    }

    /// Send a keepalive carrying 8 random peers from the local container.
    pub fn send_keepalive(&self, endpoint: Endpoint) {
        let mut slots = [unspecified_endpoint(); KEEPALIVE_PEERS];
        self.peers.random_fill(&mut slots);
        let wire = slots.map(WireEndpoint::from);
        self.send(&Message::Keepalive(wire), endpoint);
        self.peers.attempted(&endpoint, unix_now_secs());
        tracing::trace!(%endpoint, "keepalive sent");
    }

    /// Learn from a received keepalive: contact previously unknown endpoints
    /// with a keepalive of our own. Known endpoints are skipped, which bounds
    /// discovery traffic.
    pub fn merge_peers(&self, endpoints: &[WireEndpoint; KEEPALIVE_PEERS]) {
        for wire in endpoints {
            if wire.is_unspecified() {
                continue;
            }
            let endpoint: Endpoint = (*wire).into();
            if self.peers.not_a_peer(&endpoint) || self.peers.known_peer(&endpoint) {
                continue;
            }
            self.send_keepalive(endpoint);
        }
    }

    /// One republish wave: publish `block` to every peer not already known to
    /// have it. A zero rebroadcast count suppresses the wave entirely.
    /// Returns the number of peers addressed.
    pub fn republish_block(&self, block: &Block, rebroadcast: u32) -> usize {
        if rebroadcast == 0 || !self.on.load(Ordering::SeqCst) {
            return 0;
        }
        let hash = block.hash();
        let message = Message::Publish(block.clone());
        let mut sent = 0;
        for info in self.peers.list() {
            if self.peers.knows_about(&info.endpoint, &hash) {
                continue;
            }
            self.send(&message, info.endpoint);
            sent += 1;
        }
        tracing::trace!(%hash, peers = sent, rebroadcast, "block republished");
        sent
    }

    /// Ask every peer to vote on `block`.
    pub fn broadcast_confirm_req(&self, block: &Block) -> usize {
        let message = Message::ConfirmReq(block.clone());
        let mut sent = 0;
        for info in self.peers.list() {
            self.send(&message, info.endpoint);
            sent += 1;
        }
        tracing::trace!(hash = %block.hash(), peers = sent, "confirm_req broadcast");
        sent
    }

    /// Ask one peer to vote on `block`.
    pub fn send_confirm_req(&self, endpoint: Endpoint, block: &Block) {
        self.send(&Message::ConfirmReq(block.clone()), endpoint);
    }

    /// Answer a confirm_req: send a signed vote as a confirm_ack.
    pub fn confirm_block(&self, vote: Vote, endpoint: Endpoint) {
        self.send(&Message::ConfirmAck(vote), endpoint);
    }
}
