//! # Instructions
//!
//! What a flow asks the embedding node to do, and what comes back.

use super::message::ProtocolMessage;
use super::opcode::Opcode;
use sc_01_channel_model::{AppInstance, AppInstanceProposal, StateChannel};
use sc_02_commitments::CommitmentRecord;
use shared_crypto::Signature;
use shared_types::{Address, Bytes32};

/// What a persisted commitment is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitmentSubject {
    /// Setup commitments, keyed by the channel.
    Multisig(Address),
    /// SetState and conditional commitments, keyed by the app.
    App(Bytes32),
}

/// Effect on an app instance or proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistAppType {
    /// A proposal was added.
    Proposal,
    /// An app (or the free balance) was installed or updated.
    Instance,
    /// A proposal was rejected.
    Reject,
    /// An app was uninstalled.
    Uninstall,
}

/// The app or proposal a [`PersistAppType`] effect applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppRecord {
    /// An installed app.
    Instance(AppInstance),
    /// A proposal.
    Proposal(AppInstanceProposal),
}

impl AppRecord {
    /// Identity hash of the app or proposal.
    pub fn identity_hash(&self) -> Bytes32 {
        match self {
            AppRecord::Instance(app) => app.identity_hash(),
            AppRecord::Proposal(proposal) => proposal.identity_hash,
        }
    }
}

/// One instruction yielded by a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Sign `digest` with the key at `key_index`.
    Sign {
        /// Commitment hash
        digest: Bytes32,
        /// Derivation index: 0 for the free balance, the app's seq no otherwise
        key_index: u32,
    },
    /// Send without waiting.
    Send {
        /// Outgoing message
        message: ProtocolMessage,
    },
    /// Send and suspend until the reply for the same process id.
    SendAndWait {
        /// Outgoing message
        message: ProtocolMessage,
    },
    /// Save channels.
    PersistStateChannel {
        /// Channels to save
        channels: Vec<StateChannel>,
    },
    /// Save a signed commitment.
    PersistCommitment {
        /// Signed commitment
        commitment: CommitmentRecord,
        /// Key it is stored under
        subject: CommitmentSubject,
    },
    /// Apply an app effect.
    PersistAppInstance {
        /// Effect kind
        kind: PersistAppType,
        /// Channel after the effect
        channel: StateChannel,
        /// Affected app or proposal
        app: AppRecord,
    },
}

impl Instruction {
    /// Opcode selecting the handler.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Sign { .. } => Opcode::OpSign,
            Instruction::Send { .. } => Opcode::IoSend,
            Instruction::SendAndWait { .. } => Opcode::IoSendAndWait,
            Instruction::PersistStateChannel { .. } => Opcode::PersistStateChannel,
            Instruction::PersistCommitment { .. } => Opcode::PersistCommitment,
            Instruction::PersistAppInstance { .. } => Opcode::PersistAppInstance,
        }
    }
}

/// Result of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionOutput {
    /// `OP_SIGN` result.
    Signature(Signature),
    /// `IO_SEND` completed.
    Sent,
    /// `IO_SEND_AND_WAIT` reply.
    Reply(ProtocolMessage),
    /// A persist instruction completed.
    Persisted,
}

impl InstructionOutput {
    /// Variant name, for errors.
    pub fn name(&self) -> &'static str {
        match self {
            InstructionOutput::Signature(_) => "Signature",
            InstructionOutput::Sent => "Sent",
            InstructionOutput::Reply(_) => "Reply",
            InstructionOutput::Persisted => "Persisted",
        }
    }
}
