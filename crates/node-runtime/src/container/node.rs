//! # Node
//!
//! One participant: a key, a protocol runner and the adapters the runner's
//! instructions are served by.
//!
//! ## Wiring
//!
//! | Opcode | Handler |
//! |--------|---------|
//! | `OP_SIGN` | [`KeySigner`] |
//! | `IO_SEND`, `IO_SEND_AND_WAIT` | [`BusTransport`] |
//! | `PERSIST_*` | [`MemoryStore`] |
//!
//! ## Inbound
//!
//! `start` spawns the inbox loop. Replies complete the matching waiter;
//! step-1 messages start a responder run under the same named locks a
//! local controller would take; reject notifications drop the proposal.

use crate::adapters::{
    BusMessage, BusTransport, KeySigner, MemoryStore, MessageBus, NamedLocks,
};
use crate::container::config::NodeConfig;
use crate::controllers::{lock_names, remove_proposal};
use crate::ports::{BalanceReader, StateDepositHolderDeployer};
use sc_03_outcome_interpreter::{ChainReader, OutcomeInterpreterService};
use sc_04_instruction_executor::{
    ExecutorConfig, InstructionExecutor, MiddlewareRegistry, Opcode, PendingReplies,
    ProtocolMessage,
};
use sc_05_protocol_flows::{FlowContext, ProtocolRunner, ProtocolRunnerApi};
use shared_crypto::ExtendedPrivateKey;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running channel node.
pub struct Node {
    pub(crate) config: NodeConfig,
    pub(crate) public_identifier: String,
    pub(crate) runner: ProtocolRunner,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) deployer: Arc<dyn StateDepositHolderDeployer>,
    pub(crate) balances: Arc<dyn BalanceReader>,
    pub(crate) locks: NamedLocks,
    pub(crate) bus: MessageBus,
    pub(crate) pending: PendingReplies,
    shutdown_tx: watch::Sender<bool>,
}

impl Node {
    /// Wire a node for `key` on `bus`, reading and writing `chain`.
    pub fn new<C>(config: NodeConfig, key: ExtendedPrivateKey, bus: MessageBus, chain: Arc<C>) -> Self
    where
        C: ChainReader + StateDepositHolderDeployer + BalanceReader + 'static,
    {
        let signer = Arc::new(KeySigner::new(key));
        let public_identifier = signer.public_identifier();
        let store = Arc::new(MemoryStore::new());
        let pending = PendingReplies::new();

        let registry = Arc::new(MiddlewareRegistry::new());
        registry.register(Opcode::OpSign, signer);
        let transport = Arc::new(BusTransport::new(
            bus.clone(),
            pending.clone(),
            config.protocol.io_send_and_wait_timeout,
        ));
        registry.register(Opcode::IoSend, transport.clone());
        registry.register(Opcode::IoSendAndWait, transport);
        for opcode in [
            Opcode::PersistStateChannel,
            Opcode::PersistCommitment,
            Opcode::PersistAppInstance,
        ] {
            registry.register(opcode, store.clone());
        }

        let executor = InstructionExecutor::new(
            registry,
            ExecutorConfig {
                io_send_and_wait_timeout: config.protocol.io_send_and_wait_timeout,
            },
        );
        let chain_reader: Arc<dyn ChainReader> = chain.clone();
        let runner = ProtocolRunner::new(FlowContext {
            executor,
            store: store.clone(),
            chain: chain_reader.clone(),
            outcome: Arc::new(OutcomeInterpreterService::new(
                chain_reader,
                config.outcome.clone(),
            )),
            network: config.network.clone(),
            public_identifier: public_identifier.clone(),
        });

        let (shutdown_tx, _) = watch::channel(false);
        info!(identifier = %public_identifier, "[node] node created");

        Self {
            config,
            public_identifier,
            runner,
            store,
            deployer: chain.clone(),
            balances: chain,
            locks: NamedLocks::new(),
            bus,
            pending,
            shutdown_tx,
        }
    }

    /// This node's xpub.
    pub fn public_identifier(&self) -> &str {
        &self.public_identifier
    }

    /// The node's configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The node's store.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Open the inbox and start serving it.
    pub fn start(&self) -> JoinHandle<()> {
        let inbox = self.bus.connect(&self.public_identifier);
        let inbound = Inbound {
            runner: self.runner.clone(),
            store: self.store.clone(),
            locks: self.locks.clone(),
            pending: self.pending.clone(),
        };
        let shutdown = self.shutdown_tx.subscribe();
        info!(identifier = %self.public_identifier, "[node] inbox open");
        tokio::spawn(inbound.run(inbox, shutdown))
    }

    /// Close the inbox and stop the loop. Waiters time out as usual.
    pub fn shutdown(&self) {
        self.bus.disconnect(&self.public_identifier);
        if self.shutdown_tx.send(true).is_err() {
            debug!("[node] inbox loop already stopped");
        }
        info!(identifier = %self.public_identifier, "[node] shut down");
    }
}

/// What the inbox loop needs from the node.
#[derive(Clone)]
struct Inbound {
    runner: ProtocolRunner,
    store: Arc<MemoryStore>,
    locks: NamedLocks,
    pending: PendingReplies,
}

impl Inbound {
    async fn run(self, mut inbox: mpsc::UnboundedReceiver<BusMessage>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(message) => self.dispatch(message),
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!("[node] inbox loop stopped");
    }

    fn dispatch(&self, message: BusMessage) {
        match message {
            BusMessage::Protocol(message) if message.is_reply() => {
                if !self.pending.complete(message) {
                    debug!("[node] reply with no waiter dropped");
                }
            }
            BusMessage::Protocol(message) => {
                let this = self.clone();
                tokio::spawn(async move { this.respond(message).await });
            }
            BusMessage::RejectInstall {
                from,
                multisig,
                app_identity_hash,
            } => {
                let this = self.clone();
                tokio::spawn(async move {
                    let _guard = this
                        .locks
                        .acquire(lock_names(multisig, Some(app_identity_hash)))
                        .await;
                    let ctx = this.runner.context();
                    if let Err(e) = remove_proposal(ctx, &this.store, &from, multisig, app_identity_hash).await {
                        warn!(%multisig, app = %app_identity_hash, error = %e, "[node] counterparty rejection not applied");
                    }
                });
            }
        }
    }

    async fn respond(&self, message: ProtocolMessage) {
        let names = lock_names(
            message.params.multisig_address(),
            message.params.app_identity_hash(),
        );
        let _guard = self.locks.acquire(names).await;
        let process_id = message.process_id.clone();
        if let Err(e) = self.runner.respond(message).await {
            // The initiator's wait runs into its timeout.
            warn!(%process_id, error = %e, "[node] responder run failed");
        }
    }
}
