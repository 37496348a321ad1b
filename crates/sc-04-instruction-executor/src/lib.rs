//! # SC-04 Instruction Executor
//!
//! Runs the instructions protocol flows yield against handlers supplied by
//! the embedding node, and carries the protocol message envelope.
//!
//! **Subsystem ID:** 04
//! **Architecture:** Hexagonal (DDD)
//!
//! ## Module Structure
//!
//! ```text
//! sc-04-instruction-executor/
//! ├── domain/
//! │   ├── opcode       # Six instruction kinds
//! │   ├── instruction  # Instruction / InstructionOutput
//! │   ├── params       # Per-protocol parameter records
//! │   ├── message      # ProtocolMessage envelope
//! │   ├── pending      # PendingReplies correlation table
//! │   └── errors       # ExecutorError, MiddlewareError
//! ├── ports/           # Middleware (handler contract)
//! └── service          # MiddlewareRegistry, InstructionExecutor
//! ```
//!
//! The core performs no I/O itself: signing, transport and storage all go
//! through registered [`Middleware`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use domain::{
    AppRecord, CommitmentSubject, ExecutorError, InstallParams, Instruction, InstructionOutput,
    MiddlewareError, Opcode, PendingReplies, PendingStats, PersistAppType, ProposeParams, Protocol,
    ProtocolMessage, ProtocolParams, ReplyWaiter, SetupParams, TakeActionParams, UninstallParams,
    UpdateParams, UNASSIGNED_SEQ_NO,
};
pub use ports::Middleware;
pub use service::{ExecutorConfig, InstructionExecutor, MiddlewareRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
