//! Gossip substrate: peer membership and UDP transport.
//!
//! - [`peer_container`] — the membership table with liveness timestamps and
//!   per-peer block knowledge.
//! - [`udp`] — the socket: receive loop, serialized send queue, rebroadcast
//!   fan-out, keepalives.
//! - [`stats`] — the transport counters.

pub mod peer_container;
pub mod stats;
pub mod udp;

pub use peer_container::{Endpoint, PeerContainer, PeerInfo};
pub use stats::NetworkStats;
pub use udp::{MessageSink, NetworkError, UdpNetwork};
