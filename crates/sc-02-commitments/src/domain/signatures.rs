//! # Signature Checks
//!
//! The only place counterparty signatures are trusted: every accepted
//! signature is recovered and compared against the expected participant.

use super::errors::CommitmentError;
use shared_crypto::{recover_address, Signature};
use shared_types::{Address, Bytes32};
use tracing::warn;

/// Recover the signer of `signature` over `hash` and require it to be `expected`.
pub fn assert_is_valid_signature(
    expected: Address,
    hash: &Bytes32,
    signature: &Signature,
) -> Result<(), CommitmentError> {
    let recovered = recover_address(hash, signature)?;
    if recovered != expected {
        warn!(%expected, %recovered, %hash, "[sc-02] signature from unexpected signer");
        return Err(CommitmentError::InvalidSignature {
            expected,
            recovered,
            hash: *hash,
        });
    }
    Ok(())
}

/// Order `signatures` by the address each recovers to over `hash`, ascending.
///
/// The recovered signer decides the position; input order is ignored.
pub fn sort_signatures_by_signer_address(
    hash: &Bytes32,
    signatures: &[Signature],
) -> Result<Vec<Signature>, CommitmentError> {
    let mut keyed = signatures
        .iter()
        .map(|sig| Ok((recover_address(hash, sig)?, *sig)))
        .collect::<Result<Vec<_>, CommitmentError>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, sig)| sig).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use proptest::prelude::*;
    use shared_crypto::ecdsa::address_from_verifying_key;
    use shared_crypto::{keccak256, sign_digest, ExtendedPrivateKey};

    pub(crate) fn signer(seed: u8) -> (SigningKey, Address) {
        let key = ExtendedPrivateKey::from_seed(&[seed; 32])
            .unwrap()
            .derive_signing_key(0)
            .unwrap();
        let address = address_from_verifying_key(key.verifying_key());
        (key, address)
    }

    /// Two signers ordered so the first has the smaller address.
    pub(crate) fn ordered_signers() -> [(SigningKey, Address); 2] {
        let a = signer(1);
        let b = signer(2);
        if a.1 < b.1 {
            [a, b]
        } else {
            [b, a]
        }
    }

    #[test]
    fn test_valid_signature_accepted() {
        let (key, address) = signer(1);
        let hash = keccak256(b"commitment");
        let sig = sign_digest(&key, &hash).unwrap();
        assert!(assert_is_valid_signature(address, &hash, &sig).is_ok());
    }

    #[test]
    fn test_signature_from_other_signer_rejected() {
        let (_, a) = signer(1);
        let (key_b, b) = signer(2);
        let hash = keccak256(b"commitment");
        let sig = sign_digest(&key_b, &hash).unwrap();
        let err = assert_is_valid_signature(a, &hash, &sig).unwrap_err();
        assert_eq!(
            err,
            CommitmentError::InvalidSignature {
                expected: a,
                recovered: b,
                hash
            }
        );
        let message = err.to_string();
        assert!(message.contains(&a.to_hex()));
        assert!(message.contains(&b.to_hex()));
        assert!(message.contains(&hash.to_hex()));
    }

    #[test]
    fn test_signature_over_other_hash_rejected() {
        let (key, address) = signer(1);
        let sig = sign_digest(&key, &keccak256(b"one")).unwrap();
        assert!(assert_is_valid_signature(address, &keccak256(b"two"), &sig).is_err());
    }

    proptest! {
        #[test]
        fn prop_sort_is_independent_of_input_order(message in proptest::collection::vec(any::<u8>(), 0..64)) {
            let [(key_a, _), (key_b, _)] = ordered_signers();
            let hash = keccak256(&message);
            let sig_a = sign_digest(&key_a, &hash).unwrap();
            let sig_b = sign_digest(&key_b, &hash).unwrap();
            let forward = sort_signatures_by_signer_address(&hash, &[sig_a, sig_b]).unwrap();
            let reverse = sort_signatures_by_signer_address(&hash, &[sig_b, sig_a]).unwrap();
            prop_assert_eq!(&forward, &vec![sig_a, sig_b]);
            prop_assert_eq!(forward, reverse);
        }
    }
}
