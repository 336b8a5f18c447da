//! Ed25519 message signing and verification.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use strand_types::{Account, PrivateKey, Signature, Vote};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    let sig = signing_key.sign(message);
    Signature(sig.to_bytes())
}

/// Verify a signature against a message and account (public key).
///
/// Returns `true` if the signature is valid, `false` otherwise.
pub fn verify_signature(message: &[u8], signature: &Signature, account: &Account) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(account.as_bytes()) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Verify that a vote was signed by its representative.
pub fn verify_vote(vote: &Vote) -> bool {
    verify_signature(vote.hash().as_bytes(), &vote.signature, &vote.account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};
    use strand_types::{Amount, Block, BlockHash, SendBlock};

    #[test]
    fn sign_and_verify() {
        let kp = generate_keypair();
        let msg = b"strand consensus message";
        let sig = sign_message(msg, &kp.private);
        assert!(verify_signature(msg, &sig, &kp.public));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = generate_keypair();
        let sig = sign_message(b"correct message", &kp.private);
        assert!(!verify_signature(b"wrong message", &sig, &kp.public));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = generate_keypair();
        let kp2 = generate_keypair();
        let sig = sign_message(b"test", &kp1.private);
        assert!(!verify_signature(b"test", &sig, &kp2.public));
    }

    #[test]
    fn invalid_public_key_fails() {
        let kp = generate_keypair();
        let sig = sign_message(b"test", &kp.private);
        let bad_key = Account::new([0xFF; 32]);
        assert!(!verify_signature(b"test", &sig, &bad_key));
    }

    #[test]
    fn vote_signature_roundtrip() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let block = Block::Send(SendBlock {
            previous: BlockHash::new([1u8; 32]),
            destination: Account::new([2u8; 32]),
            balance: Amount::new(100),
            work: 0,
            signature: Signature::ZERO,
        });
        let mut vote = Vote {
            account: kp.public,
            signature: Signature::ZERO,
            sequence: 3,
            block,
        };
        vote.signature = sign_message(vote.hash().as_bytes(), &kp.private);
        assert!(verify_vote(&vote));

        // Tampering with the sequence invalidates the signature.
        vote.sequence = 4;
        assert!(!verify_vote(&vote));
    }
}
