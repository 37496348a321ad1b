//! # Protocol Errors

use crate::ports::outbound::StoreError;
use sc_01_channel_model::ModelError;
use sc_02_commitments::CommitmentError;
use sc_03_outcome_interpreter::{ChainError, OutcomeError};
use sc_04_instruction_executor::{ExecutorError, Protocol};
use shared_crypto::CryptoError;
use shared_types::{Address, Bytes32};
use thiserror::Error;

/// Errors that abort a protocol run. Nothing is persisted on any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Data model transition failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Commitment construction or signature verification failed.
    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    /// Outcome could not be interpreted.
    #[error(transparent)]
    Outcome(#[from] OutcomeError),

    /// An instruction failed.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The chain could not compute an action's transition.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Key derivation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No channel exists for the multisig.
    #[error("Call to getStateChannel failed when searching for multisig address: {0}. This probably means that the StateChannel does not exist yet.")]
    ChannelNotFound(Address),

    /// Setup ran for a multisig that already has a channel.
    #[error("A channel already exists for multisig {0}")]
    ChannelAlreadyExists(Address),

    /// The counterparty's message lacks a signature.
    #[error("{protocol} message for process {process_id} is missing signature \"{key}\"")]
    MissingSignature {
        /// Protocol being run
        protocol: Protocol,
        /// Correlation id
        process_id: String,
        /// customData key
        key: &'static str,
    },

    /// Install params do not describe the proposal the responder holds.
    #[error("Install params for app {app} do not match the stored proposal")]
    InstallParamsMismatch {
        /// Proposal identity hash
        app: Bytes32,
    },

    /// The message is addressed to someone else.
    #[error("Message for {to} delivered to {us}")]
    WrongRecipient {
        /// Addressee
        to: String,
        /// This node
        us: String,
    },

    /// An xpub named in the params does not own the channel.
    #[error("{xpub} is not a participant of channel {multisig}")]
    NotAChannelMember {
        /// Offending xpub
        xpub: String,
        /// Channel multisig
        multisig: Address,
    },

    /// This node was asked to initiate a protocol it is not the initiator of.
    #[error("{initiator} initiates this protocol, not {us}")]
    NotInitiator {
        /// Initiator named in the params
        initiator: String,
        /// This node
        us: String,
    },

    /// A responder was handed something other than a step-1 message.
    #[error("Cannot respond to {protocol} message with seq {seq}")]
    UnexpectedSeq {
        /// Protocol of the message
        protocol: Protocol,
        /// Its step number
        seq: i64,
    },
}
