//! # Instruction Executor Service
//!
//! Looks up the handler for an instruction's opcode and runs it. The
//! registry holds one handler per opcode; registering again replaces it.
//! Handler failures abort the flow; the executor never retries.

use crate::domain::errors::ExecutorError;
use crate::domain::instruction::{
    AppRecord, CommitmentSubject, Instruction, InstructionOutput, PersistAppType,
};
use crate::domain::message::ProtocolMessage;
use crate::domain::opcode::Opcode;
use crate::ports::Middleware;
use parking_lot::RwLock;
use sc_01_channel_model::StateChannel;
use sc_02_commitments::CommitmentRecord;
use shared_crypto::Signature;
use shared_types::Bytes32;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Hard limit on `IO_SEND_AND_WAIT`.
    pub io_send_and_wait_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            io_send_and_wait_timeout: Duration::from_secs(90),
        }
    }
}

/// One handler slot per opcode.
#[derive(Default)]
pub struct MiddlewareRegistry {
    slots: RwLock<HashMap<Opcode, Arc<dyn Middleware>>>,
}

impl MiddlewareRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `opcode`, returning the handler it replaces.
    pub fn register(
        &self,
        opcode: Opcode,
        handler: Arc<dyn Middleware>,
    ) -> Option<Arc<dyn Middleware>> {
        let previous = self.slots.write().insert(opcode, handler);
        if previous.is_some() {
            info!(%opcode, "[sc-04] replaced middleware");
        } else {
            debug!(%opcode, "[sc-04] registered middleware");
        }
        previous
    }

    /// Remove the handler for `opcode`.
    pub fn unregister(&self, opcode: Opcode) -> Option<Arc<dyn Middleware>> {
        self.slots.write().remove(&opcode)
    }

    /// Handler for `opcode`.
    pub fn get(&self, opcode: Opcode) -> Option<Arc<dyn Middleware>> {
        self.slots.read().get(&opcode).cloned()
    }

    /// Whether `opcode` has a handler.
    pub fn is_registered(&self, opcode: Opcode) -> bool {
        self.slots.read().contains_key(&opcode)
    }
}

/// Runs instructions against a registry.
#[derive(Clone)]
pub struct InstructionExecutor {
    registry: Arc<MiddlewareRegistry>,
    config: ExecutorConfig,
}

impl InstructionExecutor {
    /// Executor over `registry`.
    pub fn new(registry: Arc<MiddlewareRegistry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// The registry handlers are looked up in.
    pub fn registry(&self) -> &Arc<MiddlewareRegistry> {
        &self.registry
    }

    /// Run one instruction through its handler.
    pub async fn run(&self, instruction: Instruction) -> Result<InstructionOutput, ExecutorError> {
        let opcode = instruction.opcode();
        let handler = self
            .registry
            .get(opcode)
            .ok_or(ExecutorError::MissingMiddleware { opcode })?;

        let result = if let Instruction::SendAndWait { message } = &instruction {
            let window = self.config.io_send_and_wait_timeout;
            let protocol = message.protocol();
            let process_id = message.process_id.clone();
            match tokio::time::timeout(window, handler.handle(instruction)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(%process_id, %protocol, "[sc-04] send-and-wait timed out");
                    return Err(ExecutorError::Timeout {
                        secs: window.as_secs(),
                        protocol,
                        process_id,
                    });
                }
            }
        } else {
            handler.handle(instruction).await
        };

        result.map_err(|source| {
            warn!(%opcode, error = %source, "[sc-04] middleware failed");
            ExecutorError::Handler { opcode, source }
        })
    }

    /// `OP_SIGN`.
    pub async fn sign(&self, digest: Bytes32, key_index: u32) -> Result<Signature, ExecutorError> {
        match self.run(Instruction::Sign { digest, key_index }).await? {
            InstructionOutput::Signature(sig) => Ok(sig),
            other => Err(unexpected(Opcode::OpSign, &other)),
        }
    }

    /// `IO_SEND`.
    pub async fn send(&self, message: ProtocolMessage) -> Result<(), ExecutorError> {
        match self.run(Instruction::Send { message }).await? {
            InstructionOutput::Sent => Ok(()),
            other => Err(unexpected(Opcode::IoSend, &other)),
        }
    }

    /// `IO_SEND_AND_WAIT`.
    pub async fn send_and_wait(
        &self,
        message: ProtocolMessage,
    ) -> Result<ProtocolMessage, ExecutorError> {
        match self.run(Instruction::SendAndWait { message }).await? {
            InstructionOutput::Reply(reply) => Ok(reply),
            other => Err(unexpected(Opcode::IoSendAndWait, &other)),
        }
    }

    /// `PERSIST_STATE_CHANNEL`.
    pub async fn persist_state_channel(
        &self,
        channels: Vec<StateChannel>,
    ) -> Result<(), ExecutorError> {
        self.expect_persisted(
            Opcode::PersistStateChannel,
            Instruction::PersistStateChannel { channels },
        )
        .await
    }

    /// `PERSIST_COMMITMENT`.
    pub async fn persist_commitment(
        &self,
        commitment: impl Into<CommitmentRecord>,
        subject: CommitmentSubject,
    ) -> Result<(), ExecutorError> {
        self.expect_persisted(
            Opcode::PersistCommitment,
            Instruction::PersistCommitment {
                commitment: commitment.into(),
                subject,
            },
        )
        .await
    }

    /// `PERSIST_APP_INSTANCE`.
    pub async fn persist_app_instance(
        &self,
        kind: PersistAppType,
        channel: StateChannel,
        app: AppRecord,
    ) -> Result<(), ExecutorError> {
        self.expect_persisted(
            Opcode::PersistAppInstance,
            Instruction::PersistAppInstance { kind, channel, app },
        )
        .await
    }

    async fn expect_persisted(
        &self,
        opcode: Opcode,
        instruction: Instruction,
    ) -> Result<(), ExecutorError> {
        match self.run(instruction).await? {
            InstructionOutput::Persisted => Ok(()),
            other => Err(unexpected(opcode, &other)),
        }
    }
}

fn unexpected(opcode: Opcode, output: &InstructionOutput) -> ExecutorError {
    ExecutorError::UnexpectedOutput {
        opcode,
        output: output.name(),
    }
}
