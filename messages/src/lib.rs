//! Wire protocol for strand node-to-node UDP messages.
//!
//! Every datagram starts with an 8-byte header:
//!
//! ```text
//! byte 0      magic ('S')
//! byte 1      network discriminator ('A' live / 'B' beta / 'C' test)
//! byte 2      maximum protocol version understood by the sender
//! byte 3      protocol version used for this message
//! byte 4      minimum protocol version the sender still accepts
//! byte 5      message type
//! bytes 6..8  extension bits (little-endian u16, currently zero)
//! ```
//!
//! The body is bincode-encoded (fixint, little-endian). Keepalive bodies are
//! exactly 8 endpoint entries of 18 bytes each (16-byte IPv6 address + port),
//! so a keepalive datagram is always 152 bytes.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use strand_types::network::MAGIC;
use strand_types::{Block, BlockHash, NetworkId, Vote};
use thiserror::Error;

/// Protocol version this build speaks.
pub const VERSION_USING: u8 = 1;
/// Highest protocol version this build understands.
pub const VERSION_MAX: u8 = 1;
/// Lowest peer protocol version this build still accepts.
pub const VERSION_MIN: u8 = 1;

/// Header length in bytes.
pub const HEADER_SIZE: usize = 8;
/// Number of endpoints carried by a keepalive.
pub const KEEPALIVE_PEERS: usize = 8;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("datagram shorter than the {HEADER_SIZE}-byte header")]
    TooShort,

    #[error("bad magic byte {0:#04x}")]
    BadMagic(u8),

    #[error("message for another network ({0:#04x})")]
    WrongNetwork(u8),

    #[error("peer requires protocol version >= {0}, we speak {VERSION_USING}")]
    VersionIncompatible(u8),

    #[error("unknown message type {0}")]
    UnknownType(u8),

    #[error("malformed body: {0}")]
    Body(#[from] bincode::Error),
}

/// Message kinds, as encoded in header byte 5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    Keepalive = 2,
    Publish = 3,
    ConfirmReq = 4,
    ConfirmAck = 5,
    BulkPull = 6,
}

impl MessageKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            2 => Some(Self::Keepalive),
            3 => Some(Self::Publish),
            4 => Some(Self::ConfirmReq),
            5 => Some(Self::ConfirmAck),
            6 => Some(Self::BulkPull),
            _ => None,
        }
    }
}

/// The parsed header of a wire message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub network: u8,
    pub version_max: u8,
    pub version_using: u8,
    pub version_min: u8,
    pub kind: MessageKind,
    pub extensions: u16,
}

impl MessageHeader {
    pub fn new(network: NetworkId, kind: MessageKind) -> Self {
        Self {
            network: network.magic(),
            version_max: VERSION_MAX,
            version_using: VERSION_USING,
            version_min: VERSION_MIN,
            kind,
            extensions: 0,
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(MAGIC);
        out.push(self.network);
        out.push(self.version_max);
        out.push(self.version_using);
        out.push(self.version_min);
        out.push(self.kind as u8);
        out.extend_from_slice(&self.extensions.to_le_bytes());
    }

    pub fn parse(network: NetworkId, bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() < HEADER_SIZE {
            return Err(MessageError::TooShort);
        }
        if bytes[0] != MAGIC {
            return Err(MessageError::BadMagic(bytes[0]));
        }
        if bytes[1] != network.magic() {
            return Err(MessageError::WrongNetwork(bytes[1]));
        }
        if bytes[4] > VERSION_USING {
            return Err(MessageError::VersionIncompatible(bytes[4]));
        }
        let kind = MessageKind::from_byte(bytes[5]).ok_or(MessageError::UnknownType(bytes[5]))?;
        Ok(Self {
            network: bytes[1],
            version_max: bytes[2],
            version_using: bytes[3],
            version_min: bytes[4],
            kind,
            extensions: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }
}

/// An endpoint as carried in keepalive bodies: an IPv6 (or v4-mapped)
/// address plus a port — 18 bytes on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEndpoint {
    pub ip: [u8; 16],
    pub port: u16,
}

impl WireEndpoint {
    /// The unfilled-slot placeholder (`[::]:0`).
    pub const UNSPECIFIED: Self = Self {
        ip: [0u8; 16],
        port: 0,
    };

    pub fn is_unspecified(&self) -> bool {
        self.ip == [0u8; 16] && self.port == 0
    }
}

impl From<SocketAddr> for WireEndpoint {
    fn from(addr: SocketAddr) -> Self {
        let ip = match addr.ip() {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        };
        Self {
            ip,
            port: addr.port(),
        }
    }
}

impl From<WireEndpoint> for SocketAddr {
    fn from(wire: WireEndpoint) -> Self {
        let v6 = Ipv6Addr::from(wire.ip);
        match v6.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), wire.port),
            None => SocketAddr::new(IpAddr::V6(v6), wire.port),
        }
    }
}

/// A decoded wire message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Peer-list gossip: always exactly 8 endpoint slots, padded with
    /// [`WireEndpoint::UNSPECIFIED`].
    Keepalive([WireEndpoint; KEEPALIVE_PEERS]),
    /// A freshly published block.
    Publish(Block),
    /// A request to vote on a block's root.
    ConfirmReq(Block),
    /// A representative's signed vote.
    ConfirmAck(Vote),
    /// Bootstrap control: request the chain from `start` down to `end`.
    BulkPull { start: BlockHash, end: BlockHash },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Keepalive(_) => MessageKind::Keepalive,
            Message::Publish(_) => MessageKind::Publish,
            Message::ConfirmReq(_) => MessageKind::ConfirmReq,
            Message::ConfirmAck(_) => MessageKind::ConfirmAck,
            Message::BulkPull { .. } => MessageKind::BulkPull,
        }
    }
}

/// Encode a message for transmission: header followed by the bincode body.
pub fn encode(network: NetworkId, message: &Message) -> Result<Vec<u8>, MessageError> {
    let mut out = Vec::with_capacity(HEADER_SIZE + 160);
    MessageHeader::new(network, message.kind()).write_to(&mut out);
    let body = match message {
        Message::Keepalive(peers) => bincode::serialize(peers)?,
        Message::Publish(block) => bincode::serialize(block)?,
        Message::ConfirmReq(block) => bincode::serialize(block)?,
        Message::ConfirmAck(vote) => bincode::serialize(vote)?,
        Message::BulkPull { start, end } => bincode::serialize(&(start, end))?,
    };
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a datagram received for `network`.
pub fn decode(network: NetworkId, bytes: &[u8]) -> Result<Message, MessageError> {
    let header = MessageHeader::parse(network, bytes)?;
    let body = &bytes[HEADER_SIZE..];
    let message = match header.kind {
        MessageKind::Keepalive => Message::Keepalive(bincode::deserialize(body)?),
        MessageKind::Publish => Message::Publish(bincode::deserialize(body)?),
        MessageKind::ConfirmReq => Message::ConfirmReq(bincode::deserialize(body)?),
        MessageKind::ConfirmAck => Message::ConfirmAck(bincode::deserialize(body)?),
        MessageKind::BulkPull => {
            let (start, end) = bincode::deserialize(body)?;
            Message::BulkPull { start, end }
        }
    };
    Ok(message)
}
