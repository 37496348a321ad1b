//! # Message Bus
//!
//! In-process transport between nodes, addressed by xpub. Each connected
//! node owns an unbounded inbox; delivery never blocks the sender.
//!
//! [`BusTransport`] serves `IO_SEND` and `IO_SEND_AND_WAIT` over the bus.
//! A send-and-wait registers its process id in the node's
//! [`PendingReplies`] before the message leaves, so a fast reply cannot
//! arrive ahead of its waiter.

use async_trait::async_trait;
use dashmap::DashMap;
use sc_04_instruction_executor::{
    Instruction, InstructionOutput, Middleware, MiddlewareError, PendingReplies, ProtocolMessage,
};
use shared_types::{Address, Bytes32};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Everything a node can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    /// A protocol step or reply.
    Protocol(ProtocolMessage),
    /// The counterparty rejected a proposal; drop it too.
    RejectInstall {
        /// Rejecting node's xpub.
        from: String,
        /// Channel holding the proposal.
        multisig: Address,
        /// Rejected proposal.
        app_identity_hash: Bytes32,
    },
}

/// Delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Nobody is connected under this xpub.
    #[error("No node connected with identifier {0}")]
    UnknownRecipient(String),

    /// The recipient disconnected while the message was in flight.
    #[error("Inbox of {0} is closed")]
    Closed(String),
}

/// Shared routing table from xpub to inbox.
#[derive(Clone, Default)]
pub struct MessageBus {
    inboxes: Arc<DashMap<String, mpsc::UnboundedSender<BusMessage>>>,
}

impl MessageBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an inbox for `xpub`, replacing any previous one.
    pub fn connect(&self, xpub: &str) -> mpsc::UnboundedReceiver<BusMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.inboxes.insert(xpub.to_string(), tx).is_some() {
            warn!(xpub, "[node] inbox replaced on reconnect");
        }
        rx
    }

    /// Close the inbox for `xpub`.
    pub fn disconnect(&self, xpub: &str) {
        self.inboxes.remove(xpub);
    }

    /// Whether `xpub` has an inbox.
    pub fn is_connected(&self, xpub: &str) -> bool {
        self.inboxes.contains_key(xpub)
    }

    /// Queue `message` for `to`.
    pub fn deliver(&self, to: &str, message: BusMessage) -> Result<(), BusError> {
        let inbox = self
            .inboxes
            .get(to)
            .map(|tx| tx.clone())
            .ok_or_else(|| BusError::UnknownRecipient(to.to_string()))?;
        inbox
            .send(message)
            .map_err(|_| BusError::Closed(to.to_string()))
    }
}

/// `IO_SEND` / `IO_SEND_AND_WAIT` handler for one node.
pub struct BusTransport {
    bus: MessageBus,
    pending: PendingReplies,
    wait: Duration,
}

impl BusTransport {
    /// Transport over `bus`, parking waiters in `pending` for up to `wait`.
    pub fn new(bus: MessageBus, pending: PendingReplies, wait: Duration) -> Self {
        Self { bus, pending, wait }
    }
}

#[async_trait]
impl Middleware for BusTransport {
    async fn handle(&self, instruction: Instruction) -> Result<InstructionOutput, MiddlewareError> {
        match instruction {
            Instruction::Send { message } => {
                let to = message.to_xpub.clone();
                self.bus
                    .deliver(&to, BusMessage::Protocol(message))
                    .map_err(MiddlewareError::new)?;
                Ok(InstructionOutput::Sent)
            }
            Instruction::SendAndWait { message } => {
                let waiter = self
                    .pending
                    .register(&message.process_id, message.protocol())
                    .map_err(MiddlewareError::new)?;
                let to = message.to_xpub.clone();
                debug!(process_id = %message.process_id, to = %to, "[node] sending and waiting");
                // On failure the waiter drops and unregisters itself.
                self.bus
                    .deliver(&to, BusMessage::Protocol(message))
                    .map_err(MiddlewareError::new)?;
                let reply = waiter.wait(self.wait).await.map_err(MiddlewareError::new)?;
                Ok(InstructionOutput::Reply(reply))
            }
            other => Err(MiddlewareError::new(format!(
                "transport cannot handle {}",
                other.opcode()
            ))),
        }
    }
}
