//! # SC-01 Channel Model
//!
//! Immutable value types for a two-party state channel and the pure
//! transitions between them.
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (DDD), pure domain, no ports
//!
//! ## Purpose
//!
//! Both parties run every transition independently and must arrive at
//! byte-identical values. Every transition therefore:
//! - takes `&self` and returns a **new** value, never mutating in place
//! - depends only on its inputs (no clock, no randomness, no I/O)
//! - fails without side effects (the prior value is still valid)
//!
//! ## Module Structure
//!
//! ```text
//! sc-01-channel-model/
//! └── domain/
//!     ├── value_objects   # OutcomeType, interpreter params, AppIdentity, NetworkContext
//!     ├── free_balance    # FreeBalance ledger and increment
//!     ├── app_instance    # AppInstance and its JSON form
//!     ├── proposal        # AppInstanceProposal
//!     ├── state_channel   # StateChannel and setup/install/uninstall/setState
//!     ├── invariants      # Checks shared by the transitions
//!     └── errors          # ModelError
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;

// Re-exports
pub use domain::{
    compute_interpreter_params, AppAbiEncodings, AppIdentity, AppInstance, AppInstanceProposal,
    AppInterface, CriticalStateChannelAddresses, FreeBalance, InterpreterParams,
    ModelError, MultiAssetMultiPartyCoinTransferInterpreterParams, NetworkContext, OutcomeType,
    SingleAssetTwoPartyCoinTransferInterpreterParams, StateChannel, TwoPartyFixedOutcome,
    TwoPartyFixedOutcomeInterpreterParams, CONVENTION_FOR_ETH_TOKEN_ADDRESS,
    FREE_BALANCE_DEFAULT_TIMEOUT, FREE_BALANCE_INITIAL_STATE_TIMEOUT, FREE_BALANCE_STATE_ENCODING,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
