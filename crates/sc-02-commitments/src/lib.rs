//! # SC-02 Commitments
//!
//! Builds and verifies the signed descriptions of on-chain transactions
//! that make an off-chain channel state enforceable.
//!
//! **Subsystem ID:** 02
//!
//! ## Commitment Kinds
//!
//! | Kind | Target | Subject |
//! |------|--------|---------|
//! | Setup | multisig → delegate target | free balance identity hash |
//! | SetState | challenge registry | app identity, state hash, version, timeout |
//! | Conditional | multisig → delegate target | app identity hash + interpreter params |
//!
//! ## Security
//!
//! - `assert_is_valid_signature` is the only path by which a counterparty
//!   signature is accepted; it recovers the signer and compares addresses.
//! - Signed transactions order signatures by *recovered* signer address,
//!   ascending, regardless of the order they were collected in.
//! - A commitment never produces a transaction with fewer than two signatures.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;

// Re-exports
pub use domain::{
    assert_is_valid_signature, sort_signatures_by_signer_address, CommitmentError,
    CommitmentKind, CommitmentRecord, ConditionalTransactionCommitment, MinimalTransaction,
    MultisigOperation, SetStateCommitment, SetupCommitment,
};
pub use ports::Commitment;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
