//! Network identifier and per-network protocol constants.
//!
//! The default port, wire magic, and work threshold are compile-time
//! constants selected by the build-time network profile; a node never mixes
//! values from different networks at runtime.

use serde::{Deserialize, Serialize};

/// Identifies which strand network a node participates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkId {
    /// The production network.
    Live,
    /// The public beta network.
    Beta,
    /// Local/CI test network.
    Test,
}

/// First byte of every wire message header.
pub const MAGIC: u8 = b'S';

impl NetworkId {
    /// Default UDP peering port for this network.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Live => 7075,
            Self::Beta => 54000,
            Self::Test => 54100,
        }
    }

    /// Second header byte, discriminating the networks on the wire so a beta
    /// node never accepts live traffic.
    pub fn magic(&self) -> u8 {
        match self {
            Self::Live => b'A',
            Self::Beta => b'B',
            Self::Test => b'C',
        }
    }

    /// Minimum work value for a block to be accepted by this network.
    pub fn work_threshold(&self) -> u64 {
        match self {
            Self::Live => 0xffff_ffc0_0000_0000,
            Self::Beta | Self::Test => 0xff00_0000_0000_0000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Beta => "beta",
            Self::Test => "test",
        }
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_distinct() {
        assert_ne!(NetworkId::Live.default_port(), NetworkId::Beta.default_port());
        assert_ne!(NetworkId::Beta.default_port(), NetworkId::Test.default_port());
    }

    #[test]
    fn magic_bytes_are_distinct() {
        assert_ne!(NetworkId::Live.magic(), NetworkId::Beta.magic());
        assert_ne!(NetworkId::Beta.magic(), NetworkId::Test.magic());
    }

    #[test]
    fn live_threshold_is_hardest() {
        assert!(NetworkId::Live.work_threshold() > NetworkId::Test.work_threshold());
    }
}
