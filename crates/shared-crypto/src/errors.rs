//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid signature format
    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    /// Recovery id byte is not 0, 1, 27 or 28
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public key recovery failed
    #[error("Signer recovery failed for digest {digest}")]
    RecoveryFailed {
        /// Digest the signature was checked against
        digest: String,
    },

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Extended key string could not be decoded
    #[error("Invalid extended key {key}: {reason}")]
    InvalidExtendedKey {
        /// The offending key (truncated)
        key: String,
        /// Why decoding failed
        reason: String,
    },

    /// Child derivation produced an invalid key (probability < 2^-127)
    #[error("Child key derivation failed at index {0}")]
    DerivationFailed(u32),

    /// Index is in the hardened range, which public derivation cannot reach
    #[error("Hardened index {0} cannot be derived from a public key")]
    HardenedIndex(u32),
}
