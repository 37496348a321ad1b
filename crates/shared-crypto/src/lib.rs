//! # Shared Crypto - Channel Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | keccak-256 | Commitment digests, identity hashes |
//! | `ecdsa` | secp256k1 (recoverable) | Commitment signatures, signer recovery |
//! | `xkeys` | BIP-32 public/private child derivation | Per-index participant addresses |
//! | `abi` | Solidity ABI v2 | Canonical state, outcome and calldata encoding |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization (EIP-2)
//! - **Signer recovery**: signatures carry `v` so the signer is recovered, never trusted
//! - **Derivation**: pure functions of (extended key, index)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod xkeys;

// Re-exports
pub use abi::{AbiError, ParamType, Token};
pub use ecdsa::{address_from_public_key, recover_address, sign_digest, Signature};
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_many};
pub use xkeys::{
    sort_addresses, xkey_kth_address, xkeys_to_sorted_kth_addresses, ExtendedPrivateKey,
    ExtendedPublicKey,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
