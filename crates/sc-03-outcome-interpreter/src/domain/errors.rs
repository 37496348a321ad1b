//! # Outcome Errors

use crate::ports::outbound::ChainError;
use shared_crypto::AbiError;
use shared_types::{Address, Bytes32};
use thiserror::Error;

/// Outcome interpretation errors. None are retried except as noted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError {
    /// The encoded outcome does not decode with the outcome type's layout.
    #[error("Malformed outcome for app {app}: {reason}")]
    Malformed {
        /// App identity hash
        app: Bytes32,
        /// What failed to decode
        reason: String,
    },

    /// ABI failure while decoding.
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// The chain could not compute the outcome.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// A multi-asset outcome lists a different number of tokens than configured.
    #[error("Outcome for app {app} has {found} token lists but interpreter params name {expected}")]
    TokenCountMismatch {
        /// App identity hash
        app: Bytes32,
        /// Tokens named by the interpreter params
        expected: usize,
        /// Lists in the outcome
        found: usize,
    },

    /// Summing payouts to one beneficiary overflowed.
    #[error("Outcome for app {app} overflows the payout to {beneficiary}")]
    PayoutOverflow {
        /// App identity hash
        app: Bytes32,
        /// Beneficiary whose payout overflowed
        beneficiary: Address,
    },

    /// The refund retry loop ran out of attempts.
    #[error("no non-zero deposit found for app {app} after {attempts} attempts")]
    NoDepositFound {
        /// App identity hash
        app: Bytes32,
        /// Attempts made
        attempts: u32,
    },
}
