//! Domain layer for the instruction executor.

pub mod errors;
pub mod instruction;
pub mod message;
pub mod opcode;
pub mod params;
pub mod pending;

pub use errors::{ExecutorError, MiddlewareError};
pub use instruction::{AppRecord, CommitmentSubject, Instruction, InstructionOutput, PersistAppType};
pub use message::{Protocol, ProtocolMessage, UNASSIGNED_SEQ_NO};
pub use opcode::Opcode;
pub use params::{
    InstallParams, ProposeParams, ProtocolParams, SetupParams, TakeActionParams, UninstallParams,
    UpdateParams,
};
pub use pending::{PendingReplies, PendingStats, ReplyWaiter};
