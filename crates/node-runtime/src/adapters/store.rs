//! # In-Memory Store
//!
//! Serves the three persistence opcodes and the flows' channel reads.
//!
//! `PersistAppInstance` semantics by effect kind:
//!
//! | Kind | Channel | App record |
//! |------|---------|------------|
//! | `Proposal` | saved | proposal stored |
//! | `Instance` (free balance) | saved | untouched |
//! | `Instance` | saved | app stored |
//! | `Reject` | saved | proposal dropped |
//! | `Uninstall` | saved | app dropped, id remembered as uninstalled |

use async_trait::async_trait;
use parking_lot::RwLock;
use sc_01_channel_model::StateChannel;
use sc_02_commitments::{CommitmentKind, CommitmentRecord};
use sc_04_instruction_executor::{
    AppRecord, CommitmentSubject, Instruction, InstructionOutput, Middleware, MiddlewareError,
    PersistAppType,
};
use sc_05_protocol_flows::{StateChannelReader, StoreError};
use shared_types::{Address, Bytes32};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Channels, commitments and app records held in memory.
#[derive(Default)]
pub struct MemoryStore {
    channels: RwLock<HashMap<Address, StateChannel>>,
    commitments: RwLock<HashMap<(CommitmentKind, CommitmentSubject), CommitmentRecord>>,
    apps: RwLock<HashMap<Bytes32, (Address, AppRecord)>>,
    uninstalled: RwLock<HashSet<Bytes32>>,
    /// Fail every read and write (for tests).
    pub should_fail: AtomicBool,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is failing".into()));
        }
        Ok(())
    }

    /// Save `channel`, replacing any previous version.
    pub fn put_channel(&self, channel: StateChannel) {
        self.channels.write().insert(channel.multisig_address(), channel);
    }

    /// The channel for `multisig`.
    pub fn channel(&self, multisig: &Address) -> Option<StateChannel> {
        self.channels.read().get(multisig).cloned()
    }

    /// Every stored channel.
    pub fn channels(&self) -> Vec<StateChannel> {
        self.channels.read().values().cloned().collect()
    }

    /// The channel holding installed app `app`, or whose free balance it is.
    pub fn channel_for_app(&self, app: &Bytes32) -> Option<StateChannel> {
        self.channels
            .read()
            .values()
            .find(|c| {
                c.is_app_instance_installed(app)
                    || c.free_balance_app_instance().identity_hash() == *app
            })
            .cloned()
    }

    /// The channel holding proposal `app`.
    pub fn channel_for_proposal(&self, app: &Bytes32) -> Option<StateChannel> {
        self.channels
            .read()
            .values()
            .find(|c| c.proposed_app_instances().contains_key(app))
            .cloned()
    }

    /// Latest commitment of `kind` about `subject`.
    pub fn commitment(&self, kind: CommitmentKind, subject: CommitmentSubject) -> Option<CommitmentRecord> {
        self.commitments.read().get(&(kind, subject)).cloned()
    }

    /// Stored record for `app`, with its channel's multisig.
    pub fn app_record(&self, app: &Bytes32) -> Option<(Address, AppRecord)> {
        self.apps.read().get(app).cloned()
    }

    /// Whether `app` was installed and has since been uninstalled.
    pub fn is_uninstalled(&self, app: &Bytes32) -> bool {
        self.uninstalled.read().contains(app)
    }

    fn persist_app(&self, kind: PersistAppType, channel: StateChannel, app: AppRecord) {
        let multisig = channel.multisig_address();
        let hash = app.identity_hash();
        let is_free_balance = channel.free_balance_app_instance().identity_hash() == hash;
        self.put_channel(channel);

        let mut apps = self.apps.write();
        match kind {
            PersistAppType::Proposal => {
                apps.insert(hash, (multisig, app));
            }
            PersistAppType::Instance if is_free_balance => {}
            PersistAppType::Instance => {
                apps.insert(hash, (multisig, app));
            }
            PersistAppType::Reject => {
                apps.remove(&hash);
            }
            PersistAppType::Uninstall => {
                apps.remove(&hash);
                self.uninstalled.write().insert(hash);
            }
        }
        debug!(%multisig, app = %hash, ?kind, "[node] app record persisted");
    }
}

#[async_trait]
impl StateChannelReader for MemoryStore {
    async fn get_state_channel(&self, multisig: &Address) -> Result<Option<StateChannel>, StoreError> {
        self.check()?;
        Ok(self.channel(multisig))
    }
}

#[async_trait]
impl Middleware for MemoryStore {
    async fn handle(&self, instruction: Instruction) -> Result<InstructionOutput, MiddlewareError> {
        self.check().map_err(MiddlewareError::new)?;
        match instruction {
            Instruction::PersistStateChannel { channels } => {
                for channel in channels {
                    self.put_channel(channel);
                }
            }
            Instruction::PersistCommitment {
                commitment,
                subject,
            } => {
                self.commitments
                    .write()
                    .insert((commitment.kind(), subject), commitment);
            }
            Instruction::PersistAppInstance { kind, channel, app } => {
                self.persist_app(kind, channel, app);
            }
            other => {
                return Err(MiddlewareError::new(format!(
                    "store cannot handle {}",
                    other.opcode()
                )))
            }
        }
        Ok(InstructionOutput::Persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_01_channel_model::{AppInstanceProposal, CriticalStateChannelAddresses};
    use shared_crypto::ExtendedPrivateKey;

    fn channel() -> StateChannel {
        let xpubs: Vec<String> = [1u8, 2]
            .iter()
            .map(|s| ExtendedPrivateKey::from_seed(&[*s; 32]).unwrap().neuter().to_string())
            .collect();
        StateChannel::setup_channel(
            Address([0xFB; 20]),
            CriticalStateChannelAddresses::default(),
            Address([0x4D; 20]),
            &xpubs,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_persist_channel_then_read() {
        let store = MemoryStore::new();
        let c = channel();
        store
            .handle(Instruction::PersistStateChannel {
                channels: vec![c.clone()],
            })
            .await
            .unwrap();
        assert_eq!(store.get_state_channel(&Address([0x4D; 20])).await.unwrap(), Some(c));
        assert_eq!(store.get_state_channel(&Address([1; 20])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_free_balance_instance_saves_only_channel() {
        let store = MemoryStore::new();
        let c = channel();
        let fb = c.free_balance_app_instance().clone();
        store
            .handle(Instruction::PersistAppInstance {
                kind: PersistAppType::Instance,
                channel: c.clone(),
                app: AppRecord::Instance(fb.clone()),
            })
            .await
            .unwrap();
        assert!(store.channel(&c.multisig_address()).is_some());
        assert!(store.app_record(&fb.identity_hash()).is_none());
    }

    #[tokio::test]
    async fn test_reject_drops_proposal_record() {
        let store = MemoryStore::new();
        let c = channel();
        let proposal = AppInstanceProposal {
            identity_hash: Bytes32([0xA1; 32]),
            ..sample_proposal()
        };
        for kind in [PersistAppType::Proposal, PersistAppType::Reject] {
            store
                .handle(Instruction::PersistAppInstance {
                    kind,
                    channel: c.clone(),
                    app: AppRecord::Proposal(proposal.clone()),
                })
                .await
                .unwrap();
            let stored = store.app_record(&proposal.identity_hash).is_some();
            assert_eq!(stored, kind == PersistAppType::Proposal);
            assert!(!store.is_uninstalled(&proposal.identity_hash));
        }
    }

    fn sample_proposal() -> AppInstanceProposal {
        AppInstanceProposal {
            identity_hash: Bytes32::ZERO,
            app_definition: Address([0xAD; 20]),
            abi_encodings: sc_01_channel_model::AppAbiEncodings {
                state_encoding: "tuple(uint256 counter)".into(),
                action_encoding: None,
            },
            initiator_deposit: Default::default(),
            initiator_deposit_token_address: Address::ZERO,
            responder_deposit: Default::default(),
            responder_deposit_token_address: Address::ZERO,
            timeout: 10,
            initial_state: serde_json::json!({ "counter": 0 }),
            app_seq_no: 1,
            proposed_by_identifier: String::new(),
            proposed_to_identifier: String::new(),
            outcome_type: sc_01_channel_model::OutcomeType::SingleAssetTwoPartyCoinTransfer,
            meta: None,
        }
    }

    #[tokio::test]
    async fn test_commitments_keyed_by_kind_and_subject() {
        let store = MemoryStore::new();
        let c = channel();
        let setup = sc_02_commitments::SetupCommitment::new(
            &sc_01_channel_model::NetworkContext::default(),
            &c,
        )
        .unwrap();
        let subject = CommitmentSubject::Multisig(c.multisig_address());
        store
            .handle(Instruction::PersistCommitment {
                commitment: setup.clone().into(),
                subject,
            })
            .await
            .unwrap();
        assert!(store.commitment(CommitmentKind::Setup, subject).is_some());
        assert!(store.commitment(CommitmentKind::SetState, subject).is_none());
    }

    #[tokio::test]
    async fn test_failing_store_rejects_writes() {
        let store = MemoryStore::new();
        store.should_fail.store(true, Ordering::SeqCst);
        let err = store
            .handle(Instruction::PersistStateChannel { channels: vec![channel()] })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("store is failing"));
        assert!(store.get_state_channel(&Address([0x4D; 20])).await.is_err());
    }
}
