//! # Ports
//!
//! The interface every commitment kind exposes to the protocol flows.

use crate::domain::entities::{CommitmentKind, MinimalTransaction};
use crate::domain::errors::CommitmentError;
use shared_crypto::Signature;
use shared_types::Bytes32;

/// A commitment: a canonical encoding, its digest and collected signatures.
pub trait Commitment: Send + Sync {
    /// Which of the three kinds this is.
    fn kind(&self) -> CommitmentKind;

    /// Fixed-layout packing of the hash inputs.
    fn encode(&self) -> Vec<u8>;

    /// keccak-256 of [`Commitment::encode`].
    fn hash_to_sign(&self) -> Bytes32 {
        shared_crypto::keccak256(&self.encode())
    }

    /// Signatures collected so far.
    fn signatures(&self) -> &[Signature];

    /// Replace the signature list. Fewer than two is an error.
    fn set_signatures(&mut self, signatures: Vec<Signature>) -> Result<(), CommitmentError>;

    /// The on-chain transaction, signatures ordered by recovered signer.
    fn get_signed_transaction(&self) -> Result<MinimalTransaction, CommitmentError>;
}

/// Shared threshold check for [`Commitment::set_signatures`].
pub(crate) fn require_two(
    kind: CommitmentKind,
    signatures: &[Signature],
) -> Result<(), CommitmentError> {
    if signatures.len() < 2 {
        return Err(CommitmentError::InsufficientSignatures {
            kind: kind.as_str(),
            count: signatures.len(),
        });
    }
    Ok(())
}
