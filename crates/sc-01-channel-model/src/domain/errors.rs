//! # Model Errors
//!
//! Every transition failure leaves the prior value untouched; these errors
//! describe why the new value could not be built.

use primitive_types::U256;
use shared_crypto::{AbiError, CryptoError};
use shared_types::{Address, Bytes32, TypeError};
use thiserror::Error;

/// Channel data model errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Key derivation or signature primitive failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A state blob or interpreter parameter failed to encode or decode.
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// A primitive value failed to parse.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// An increment would drive a free balance below zero.
    #[error(
        "Free balance for token {token} would go negative for {beneficiary}: balance {balance}, debit {debit}"
    )]
    NegativeBalance {
        /// Token address
        token: Address,
        /// Beneficiary whose balance would go negative
        beneficiary: Address,
        /// Current balance
        balance: U256,
        /// Requested debit
        debit: U256,
    },

    /// An increment would overflow 256 bits.
    #[error("Free balance for token {token} overflows for {beneficiary}")]
    BalanceOverflow {
        /// Token address
        token: Address,
        /// Beneficiary whose balance would overflow
        beneficiary: Address,
    },

    /// The app is not in the installed map.
    #[error("App instance {0} is not installed in this channel")]
    AppNotInstalled(Bytes32),

    /// The app is already in the installed map.
    #[error("App instance {0} is already installed in this channel")]
    AppAlreadyInstalled(Bytes32),

    /// No proposal with this identity hash.
    #[error("No proposed AppInstance exists for the given appInstanceId: {0}")]
    ProposalNotFound(Bytes32),

    /// The free balance cannot be installed, uninstalled or proposed.
    #[error("Cannot uninstall the FreeBalance of channel: {0}")]
    FreeBalanceNotAllowed(Address),

    /// An app's participants are not the signers derived at its sequence number.
    #[error("App {app} participants {actual:?} do not match signing keys {expected:?}")]
    ParticipantMismatch {
        /// App identity hash
        app: Bytes32,
        /// Signing keys derived at the app's sequence number
        expected: Vec<Address>,
        /// Participants the app carries
        actual: Vec<Address>,
    },

    /// A channel needs exactly two participants.
    #[error("A channel requires exactly 2 participants, got {0}")]
    InvalidParticipantCount(usize),

    /// The free balance app state does not have the ledger shape.
    #[error("Invalid free balance state: {0}")]
    InvalidFreeBalanceState(String),

    /// Outcome type tag string is not recognised.
    #[error("Unknown outcome type: {0}")]
    UnknownOutcomeType(String),

    /// The interpreter params do not match the outcome type tag.
    #[error("App {app} has outcome type {outcome_type} but no matching interpreter params")]
    InterpreterParamsMismatch {
        /// App identity hash
        app: String,
        /// Declared outcome type
        outcome_type: String,
    },

    /// A serialized identity hash does not match the one recomputed from the app's fields.
    #[error("Identity hash mismatch: stored {stored}, computed {computed}")]
    IdentityHashMismatch {
        /// Hash carried in the JSON
        stored: Bytes32,
        /// Hash recomputed from immutable fields
        computed: Bytes32,
    },

    /// The outcome type pays out in a single asset but the deposits differ.
    #[error("For a {outcome_type} there cannot be two kinds of tokens deposited: {first} and {second}")]
    MixedDepositAssets {
        /// Outcome type tag of the proposal
        outcome_type: String,
        /// Initiator deposit token
        first: Address,
        /// Responder deposit token
        second: Address,
    },

    /// A proposal with this identity hash is already pending or installed.
    #[error("App instance {0} has already been proposed in this channel")]
    DuplicateProposal(Bytes32),

    /// The state is not encodable with the app's state encoding.
    #[error("The state object is not encodable by the AppInstance's state encoding: {0}")]
    StateNotEncodable(String),

    /// A proposal carries no initial state.
    #[error("A proposed AppInstance cannot have an empty initial state")]
    EmptyInitialState,

    /// The app has no action encoding.
    #[error("The AppInstance {0} does not have an Action encoding defined")]
    NoActionEncoding(Bytes32),
}
