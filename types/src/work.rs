//! Proof-of-work validation.
//!
//! Work generation lives outside the core; validation is a single Blake2b
//! evaluation. The work value covers the block *root*, so a precomputed nonce
//! stays valid for whichever block ultimately extends the chain slot.

use crate::hash::Root;
use crate::network::NetworkId;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// The work value of a nonce for a given root: Blake2b-256 over the
/// little-endian nonce followed by the root bytes, first 8 bytes interpreted
/// as a little-endian u64.
pub fn work_value(root: &Root, work: u64) -> u64 {
    let mut input = [0u8; 40];
    input[0..8].copy_from_slice(&work.to_le_bytes());
    input[8..40].copy_from_slice(root.as_bytes());

    let hash = Blake2b256::digest(input);
    u64::from_le_bytes([
        hash[0], hash[1], hash[2], hash[3], hash[4], hash[5], hash[6], hash[7],
    ])
}

/// Whether a nonce meets the network's minimum work threshold for `root`.
pub fn work_valid(network: NetworkId, root: &Root, work: u64) -> bool {
    work_value(root, work) >= network.work_threshold()
}

/// Brute-force a valid nonce. Test-network thresholds make this fast enough
/// for tests; production nodes obtain work from the external work provider.
pub fn work_generate(network: NetworkId, root: &Root) -> u64 {
    let mut nonce = 0u64;
    loop {
        if work_valid(network, root, nonce) {
            return nonce;
        }
        nonce = nonce.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::BlockHash;

    #[test]
    fn generated_work_validates() {
        let root = BlockHash::new([0xDE; 32]);
        let nonce = work_generate(NetworkId::Test, &root);
        assert!(work_valid(NetworkId::Test, &root, nonce));
    }

    #[test]
    fn work_is_root_specific() {
        let root = BlockHash::new([0x11; 32]);
        let other = BlockHash::new([0x22; 32]);
        assert_ne!(work_value(&root, 12345), work_value(&other, 12345));
    }

    #[test]
    fn max_threshold_rejects() {
        // work_value is < u64::MAX for almost any input; a fixed nonce
        // certainly fails the hardest possible threshold.
        let root = BlockHash::new([0xFF; 32]);
        assert!(work_value(&root, 1) < u64::MAX);
    }
}
