//! # Node Errors

use crate::adapters::BusError;
use primitive_types::U256;
use sc_01_channel_model::ModelError;
use sc_03_outcome_interpreter::ChainError;
use sc_04_instruction_executor::ExecutorError;
use sc_05_protocol_flows::{ProtocolError, StoreError};
use shared_crypto::CryptoError;
use shared_types::{Address, Bytes32};
use thiserror::Error;

/// Errors returned by the node's controllers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// A protocol run failed. The channel is at its pre-protocol state.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A local channel transition failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A local instruction failed.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A chain call failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// An identifier is not a valid xpub.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A notification could not be delivered.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// The app identity hash argument is missing.
    #[error("No AppInstanceId specified to {0}")]
    NoAppInstanceId(&'static str),

    /// No channel for this multisig.
    #[error("Call to getStateChannel failed when searching for multisig address: {0}. This probably means that the StateChannel does not exist yet.")]
    ChannelNotFound(Address),

    /// No channel holds this app, installed or proposed.
    #[error("No channel found holding app instance {0}")]
    NoChannelForApp(Bytes32),

    /// The app was installed once but no longer is.
    #[error("Cannot uninstall app {0}, it has already been uninstalled")]
    AlreadyUninstalled(Bytes32),

    /// A party's free balance cannot cover its deposit.
    #[error(
        "Node with identifier {identifier} has insufficient funds in channel {multisig} for token {token} to allocate towards an AppInstance. Current free balance for token is {balance}, attempted allocation amount: {allocation}"
    )]
    InsufficientFunds {
        /// xpub of the party short on funds
        identifier: String,
        /// Channel multisig
        multisig: Address,
        /// Deposit token
        token: Address,
        /// Free balance in that token
        balance: U256,
        /// Requested deposit
        allocation: U256,
    },

    /// Multisig deployment exhausted its retries.
    #[error("Failed to create channel. Multisignature wallet cannot be deployed properly: {last_error}")]
    ChannelCreationFailed {
        /// Multisig that failed to deploy
        multisig: Address,
        /// Error from the final attempt
        last_error: String,
    },

    /// A node tried to open a channel with itself.
    #[error("Cannot open a channel with own identifier {0}")]
    SelfChannel(String),

    /// A notification came from someone outside the channel.
    #[error("{xpub} is not a participant of channel {multisig}")]
    NotAChannelMember {
        /// Sender xpub
        xpub: String,
        /// Channel multisig
        multisig: Address,
    },
}
