//! Two in-memory parties wired back to back, for flow tests.

use crate::flows::FlowContext;
use crate::ports::inbound::ProtocolRunnerApi;
use crate::ports::outbound::{StateChannelReader, StoreError};
use crate::service::ProtocolRunner;
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use sc_01_channel_model::{AppInstance, FreeBalance, NetworkContext, StateChannel};
use sc_02_commitments::CommitmentRecord;
use sc_03_outcome_interpreter::{ChainError, ChainReader, OutcomeConfig, OutcomeInterpreterService};
use sc_04_instruction_executor::{
    CommitmentSubject, ExecutorConfig, Instruction, InstructionExecutor, InstructionOutput,
    Middleware, MiddlewareError, MiddlewareRegistry, Opcode, PendingReplies,
};
use serde_json::{json, Value};
use shared_crypto::abi::{encode, Token};
use shared_crypto::{sign_digest, ExtendedPrivateKey};
use shared_types::Address;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub(crate) const MULTISIG: Address = Address([0x4D; 20]);
pub(crate) const TOKEN: Address = Address([0x70; 20]);

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub channels: Mutex<HashMap<Address, StateChannel>>,
    pub commitments: Mutex<Vec<(CommitmentRecord, CommitmentSubject)>>,
}

#[async_trait]
impl StateChannelReader for MemoryStore {
    async fn get_state_channel(&self, multisig: &Address) -> Result<Option<StateChannel>, StoreError> {
        Ok(self.channels.lock().get(multisig).cloned())
    }
}

struct Persist(Arc<MemoryStore>);

#[async_trait]
impl Middleware for Persist {
    async fn handle(&self, instruction: Instruction) -> Result<InstructionOutput, MiddlewareError> {
        match instruction {
            Instruction::PersistStateChannel { channels } => {
                for c in channels {
                    self.0.channels.lock().insert(c.multisig_address(), c);
                }
            }
            Instruction::PersistCommitment {
                commitment,
                subject,
            } => self.0.commitments.lock().push((commitment, subject)),
            Instruction::PersistAppInstance { channel, .. } => {
                self.0.channels.lock().insert(channel.multisig_address(), channel);
            }
            other => return Err(MiddlewareError::new(format!("{} not handled", other.opcode()))),
        }
        Ok(InstructionOutput::Persisted)
    }
}

struct Signer(ExtendedPrivateKey);

#[async_trait]
impl Middleware for Signer {
    async fn handle(&self, instruction: Instruction) -> Result<InstructionOutput, MiddlewareError> {
        let Instruction::Sign { digest, key_index } = instruction else {
            return Err(MiddlewareError::new("expected OP_SIGN"));
        };
        let key = self.0.derive_signing_key(key_index).map_err(MiddlewareError::new)?;
        let sig = sign_digest(&key, &digest).map_err(MiddlewareError::new)?;
        Ok(InstructionOutput::Signature(sig))
    }
}

#[derive(Clone)]
struct Peer {
    runner: ProtocolRunner,
    pending: PendingReplies,
}

/// Delivers to the peer: step-1 messages start a responder run, replies
/// complete a waiter. A failed responder run cancels the initiator's wait.
struct Wire {
    own: PendingReplies,
    peer: Arc<OnceLock<Peer>>,
}

#[async_trait]
impl Middleware for Wire {
    async fn handle(&self, instruction: Instruction) -> Result<InstructionOutput, MiddlewareError> {
        let peer = self
            .peer
            .get()
            .cloned()
            .ok_or_else(|| MiddlewareError::new("peer not connected"))?;
        match instruction {
            Instruction::Send { message } => {
                peer.pending.complete(message);
                Ok(InstructionOutput::Sent)
            }
            Instruction::SendAndWait { message } => {
                let waiter = self
                    .own
                    .register(&message.process_id, message.protocol())
                    .map_err(MiddlewareError::new)?;
                let own = self.own.clone();
                let process_id = message.process_id.clone();
                tokio::spawn(async move {
                    if peer.runner.respond(message).await.is_err() {
                        own.cancel(&process_id);
                    }
                });
                let reply = waiter
                    .wait(Duration::from_secs(90))
                    .await
                    .map_err(MiddlewareError::new)?;
                Ok(InstructionOutput::Reply(reply))
            }
            other => Err(MiddlewareError::new(format!("{} not handled", other.opcode()))),
        }
    }
}

/// Counter app: `{counter}` state, `{increment}` action. Outcome is scripted.
#[derive(Default)]
pub(crate) struct CounterChain {
    pub outcome: Mutex<Vec<u8>>,
}

#[async_trait]
impl ChainReader for CounterChain {
    async fn compute_outcome(&self, _app: &AppInstance) -> Result<Vec<u8>, ChainError> {
        Ok(self.outcome.lock().clone())
    }

    async fn compute_state_transition(
        &self,
        app: &AppInstance,
        action: &Value,
    ) -> Result<Value, ChainError> {
        let counter = app.latest_state["counter"].as_u64().unwrap_or(0);
        let increment = action["increment"].as_u64().unwrap_or(0);
        Ok(json!({ "counter": counter + increment }))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(0)
    }
}

impl CounterChain {
    /// Script a multi-asset outcome paying `pairs` in one token.
    pub fn pay(&self, pairs: &[(Address, u64)]) {
        let list = pairs
            .iter()
            .map(|(to, amount)| Token::Tuple(vec![Token::Address(*to), Token::Uint(U256::from(*amount))]))
            .collect();
        *self.outcome.lock() = encode(&[Token::Array(vec![Token::Array(list)])]);
    }
}

pub(crate) struct Node {
    pub xpub: String,
    pub store: Arc<MemoryStore>,
    pub chain: Arc<CounterChain>,
    pub runner: ProtocolRunner,
}

impl Node {
    /// Index-0 address.
    pub fn address(&self) -> Address {
        shared_crypto::xkey_kth_address(&self.xpub, 0).unwrap()
    }

    pub fn channel(&self) -> StateChannel {
        self.store.channels.lock()[&MULTISIG].clone()
    }

    /// Credit both owners `amount` of TOKEN, outside any protocol.
    pub fn fund(&self, amount: u64) {
        let channel = self.channel();
        let fb = FreeBalance::with_funded_tokens(
            &channel.multisig_owners().unwrap(),
            U256::from(amount),
            &[TOKEN],
        );
        let funded = channel.set_free_balance(&fb).unwrap();
        self.store.channels.lock().insert(MULTISIG, funded);
    }
}

fn node(seed: u8, signing_seed: u8, wire: Arc<OnceLock<Peer>>, pending: PendingReplies) -> (Node, Peer) {
    let key = ExtendedPrivateKey::from_seed(&[seed; 32]).unwrap();
    let signing_key = ExtendedPrivateKey::from_seed(&[signing_seed; 32]).unwrap();
    let xpub = key.neuter().to_string();
    let store = Arc::new(MemoryStore::default());
    let chain = Arc::new(CounterChain::default());

    let registry = Arc::new(MiddlewareRegistry::new());
    registry.register(Opcode::OpSign, Arc::new(Signer(signing_key)));
    let io = Arc::new(Wire {
        own: pending.clone(),
        peer: wire,
    });
    registry.register(Opcode::IoSend, io.clone());
    registry.register(Opcode::IoSendAndWait, io);
    let persist = Arc::new(Persist(store.clone()));
    for op in [
        Opcode::PersistStateChannel,
        Opcode::PersistCommitment,
        Opcode::PersistAppInstance,
    ] {
        registry.register(op, persist.clone());
    }

    let runner = ProtocolRunner::new(FlowContext {
        executor: InstructionExecutor::new(registry, ExecutorConfig::default()),
        store: store.clone(),
        chain: chain.clone(),
        outcome: Arc::new(OutcomeInterpreterService::new(chain.clone(), OutcomeConfig::default())),
        network: NetworkContext {
            identity_app: Address([0xFB; 20]),
            challenge_registry: Address([0xCC; 20]),
            ..NetworkContext::default()
        },
        public_identifier: xpub.clone(),
    });
    let peer = Peer {
        runner: runner.clone(),
        pending,
    };
    (
        Node {
            xpub,
            store,
            chain,
            runner,
        },
        peer,
    )
}

/// Two connected nodes. `b_signs_with` lets B sign with a foreign key.
pub(crate) fn pair_with(b_signs_with: u8) -> (Node, Node) {
    let to_b = Arc::new(OnceLock::new());
    let to_a = Arc::new(OnceLock::new());
    let (a, peer_a) = node(1, 1, to_b.clone(), PendingReplies::new());
    let (b, peer_b) = node(2, b_signs_with, to_a.clone(), PendingReplies::new());
    let _ = to_b.set(peer_b);
    let _ = to_a.set(peer_a);
    (a, b)
}

pub(crate) fn pair() -> (Node, Node) {
    pair_with(2)
}
