//! # Ports
//!
//! The handler contract the embedding node implements, one per opcode.

use crate::domain::errors::MiddlewareError;
use crate::domain::instruction::{Instruction, InstructionOutput};
use async_trait::async_trait;

/// Handler for one opcode.
///
/// Persist handlers must complete the write before returning; flows do not
/// reply to the counterparty until they do.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Run the instruction.
    async fn handle(&self, instruction: Instruction) -> Result<InstructionOutput, MiddlewareError>;
}
