//! # Executor Errors

use super::message::Protocol;
use super::opcode::Opcode;
use thiserror::Error;

/// Failure reported by a middleware handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MiddlewareError(pub String);

impl MiddlewareError {
    /// Wrap any displayable failure.
    pub fn new(reason: impl std::fmt::Display) -> Self {
        Self(reason.to_string())
    }
}

/// Errors raised while running an instruction. All abort the current flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// No handler is registered for the opcode.
    #[error("Attempted to run middleware for opcode {opcode} but none existed")]
    MissingMiddleware {
        /// Opcode without a handler
        opcode: Opcode,
    },

    /// The handler failed.
    #[error("Middleware for {opcode} failed: {source}")]
    Handler {
        /// Opcode being run
        opcode: Opcode,
        /// Handler failure
        source: MiddlewareError,
    },

    /// No reply arrived within the send-and-wait window.
    #[error("IO_SEND_AND_WAIT timed out after {secs}s waiting for counterparty reply in {protocol}")]
    Timeout {
        /// Window length in seconds
        secs: u64,
        /// Protocol awaiting the reply
        protocol: Protocol,
        /// Correlation id of the run
        process_id: String,
    },

    /// The handler returned an output of the wrong shape for its opcode.
    #[error("Middleware for {opcode} returned {output} output")]
    UnexpectedOutput {
        /// Opcode being run
        opcode: Opcode,
        /// Name of the output variant received
        output: &'static str,
    },

    /// The pending reply slot was dropped before a reply was delivered.
    #[error("Reply slot for process {process_id} closed before a reply arrived")]
    ReplyChannelClosed {
        /// Correlation id of the run
        process_id: String,
    },

    /// A second waiter registered for the same process id.
    #[error("A reply is already pending for process {process_id}")]
    DuplicateWaiter {
        /// Correlation id of the run
        process_id: String,
    },
}
