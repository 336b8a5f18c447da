use proptest::prelude::*;

use strand_types::{
    Account, Amount, Block, BlockHash, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock, Signature,
    Vote,
};

fn arb_hash() -> impl Strategy<Value = BlockHash> {
    prop::array::uniform32(0u8..).prop_map(BlockHash::new)
}

fn arb_account() -> impl Strategy<Value = Account> {
    prop::array::uniform32(0u8..).prop_map(Account::new)
}

fn arb_block() -> impl Strategy<Value = Block> {
    prop_oneof![
        (arb_hash(), arb_account(), any::<u128>(), any::<u64>()).prop_map(
            |(previous, destination, balance, work)| Block::Send(SendBlock {
                previous,
                destination,
                balance: Amount::new(balance),
                work,
                signature: Signature::ZERO,
            })
        ),
        (arb_hash(), arb_hash(), any::<u64>()).prop_map(|(previous, source, work)| {
            Block::Receive(ReceiveBlock {
                previous,
                source,
                work,
                signature: Signature::ZERO,
            })
        }),
        (arb_hash(), arb_account(), arb_account(), any::<u64>()).prop_map(
            |(source, representative, account, work)| Block::Open(OpenBlock {
                source,
                representative,
                account,
                work,
                signature: Signature::ZERO,
            })
        ),
        (arb_hash(), arb_account(), any::<u64>()).prop_map(|(previous, representative, work)| {
            Block::Change(ChangeBlock {
                previous,
                representative,
                work,
                signature: Signature::ZERO,
            })
        }),
    ]
}

proptest! {
    /// BlockHash roundtrip: new -> as_bytes -> new produces identical hash.
    #[test]
    fn block_hash_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        prop_assert_eq!(hash.as_bytes(), &bytes);
    }

    /// BlockHash display/parse roundtrip.
    #[test]
    fn block_hash_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        let parsed: BlockHash = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// Byte-wise hash ordering matches array ordering (the election
    /// tie-break relies on this being deterministic).
    #[test]
    fn block_hash_ordering_matches_bytes(
        a in prop::array::uniform32(0u8..),
        b in prop::array::uniform32(0u8..),
    ) {
        prop_assert_eq!(BlockHash::new(a) < BlockHash::new(b), a < b);
    }

    /// Block bincode roundtrip preserves the hash and root.
    #[test]
    fn block_bincode_roundtrip(block in arb_block()) {
        let bytes = bincode::serialize(&block).unwrap();
        let decoded: Block = bincode::deserialize(&bytes).unwrap();
        prop_assert_eq!(decoded.hash(), block.hash());
        prop_assert_eq!(decoded.root(), block.root());
        prop_assert_eq!(decoded, block);
    }

    /// A block's hash never depends on its work nonce.
    #[test]
    fn block_hash_independent_of_work(block in arb_block(), work in any::<u64>()) {
        let reworked = match block.clone() {
            Block::Send(mut b) => { b.work = work; Block::Send(b) }
            Block::Receive(mut b) => { b.work = work; Block::Receive(b) }
            Block::Open(mut b) => { b.work = work; Block::Open(b) }
            Block::Change(mut b) => { b.work = work; Block::Change(b) }
        };
        prop_assert_eq!(reworked.hash(), block.hash());
    }

    /// Vote bincode roundtrip.
    #[test]
    fn vote_bincode_roundtrip(block in arb_block(), sequence in any::<u64>()) {
        let vote = Vote {
            account: Account::new([1u8; 32]),
            signature: Signature::ZERO,
            sequence,
            block,
        };
        let bytes = bincode::serialize(&vote).unwrap();
        let decoded: Vote = bincode::deserialize(&bytes).unwrap();
        prop_assert_eq!(decoded.hash(), vote.hash());
        prop_assert_eq!(decoded, vote);
    }

    /// Amount checked_add agrees with plain addition when it fits.
    #[test]
    fn amount_checked_add(a in 0u128..u128::MAX / 2, b in 0u128..u128::MAX / 2) {
        prop_assert_eq!(
            Amount::new(a).checked_add(Amount::new(b)),
            Some(Amount::new(a + b))
        );
    }

    /// Amount::div never panics and matches integer division.
    #[test]
    fn amount_div(a in any::<u128>(), d in 1u128..1_000_000) {
        prop_assert_eq!(Amount::new(a).div(d), Amount::new(a / d));
    }
}
