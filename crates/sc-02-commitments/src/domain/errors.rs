//! # Commitment Errors

use sc_01_channel_model::ModelError;
use shared_crypto::CryptoError;
use shared_types::{Address, Bytes32};
use thiserror::Error;

/// Commitment construction and signature errors.
///
/// Every variant is fatal to the protocol run that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    /// Signer recovery or signature parsing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The subject app or channel could not produce its hash inputs.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A recovered signer is not the expected participant.
    #[error(
        "Validating a signature with expected signer {expected} but recovered {recovered} for commitment hash {hash}."
    )]
    InvalidSignature {
        /// Participant expected to have signed
        expected: Address,
        /// Address recovered from the signature
        recovered: Address,
        /// Commitment hash the signature was checked against
        hash: Bytes32,
    },

    /// Fewer signatures than participants.
    #[error("{kind} commitment needs at least 2 signatures, got {count}")]
    InsufficientSignatures {
        /// Commitment kind
        kind: &'static str,
        /// Signatures supplied
        count: usize,
    },

    /// A persisted commitment's identity hash does not match its identity.
    #[error("Commitment identity hash {stored} does not match computed {computed}")]
    IdentityHashMismatch {
        /// Hash carried in the JSON
        stored: Bytes32,
        /// Hash recomputed from the app identity
        computed: Bytes32,
    },
}
