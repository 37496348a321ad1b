//! # Protocol Runner
//!
//! Dispatches a protocol run to the flow for its params, in the initiator
//! or responder role.

use crate::domain::errors::ProtocolError;
use crate::flows::{self, FlowContext};
use crate::ports::inbound::ProtocolRunnerApi;
use async_trait::async_trait;
use sc_01_channel_model::StateChannel;
use sc_04_instruction_executor::{ProtocolMessage, ProtocolParams};
use tracing::{info, warn};

/// Runs protocols for one node.
#[derive(Clone)]
pub struct ProtocolRunner {
    ctx: FlowContext,
}

impl ProtocolRunner {
    /// Runner over `ctx`.
    pub fn new(ctx: FlowContext) -> Self {
        Self { ctx }
    }

    /// The context flows run in.
    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }
}

#[async_trait]
impl ProtocolRunnerApi for ProtocolRunner {
    async fn initiate(&self, params: ProtocolParams) -> Result<StateChannel, ProtocolError> {
        let (initiator, _) = params.xpubs();
        if initiator != self.ctx.public_identifier {
            return Err(ProtocolError::NotInitiator {
                initiator: initiator.to_string(),
                us: self.ctx.public_identifier.clone(),
            });
        }
        let protocol = params.protocol();
        let multisig = params.multisig_address();
        info!(%protocol, %multisig, "[sc-05] initiating protocol");

        let result = match params {
            ProtocolParams::Setup(p) => flows::setup::initiate(&self.ctx, p).await,
            ProtocolParams::Propose(p) => flows::propose::initiate(&self.ctx, p).await,
            ProtocolParams::Install(p) => flows::install::initiate(&self.ctx, p).await,
            ProtocolParams::Update(p) => flows::update::initiate(&self.ctx, p).await,
            ProtocolParams::TakeAction(p) => flows::take_action::initiate(&self.ctx, p).await,
            ProtocolParams::Uninstall(p) => flows::uninstall::initiate(&self.ctx, p).await,
        };
        if let Err(e) = &result {
            warn!(%protocol, %multisig, error = %e, "[sc-05] protocol failed as initiator");
        }
        result
    }

    async fn respond(&self, message: ProtocolMessage) -> Result<StateChannel, ProtocolError> {
        let protocol = message.protocol();
        if message.seq != 1 {
            return Err(ProtocolError::UnexpectedSeq {
                protocol,
                seq: message.seq,
            });
        }
        if message.to_xpub != self.ctx.public_identifier {
            return Err(ProtocolError::WrongRecipient {
                to: message.to_xpub.clone(),
                us: self.ctx.public_identifier.clone(),
            });
        }
        let multisig = message.params.multisig_address();
        info!(
            process_id = %message.process_id,
            %protocol,
            %multisig,
            "[sc-05] responding to protocol"
        );

        let result = match message.params.clone() {
            ProtocolParams::Setup(p) => flows::setup::respond(&self.ctx, &message, p).await,
            ProtocolParams::Propose(p) => flows::propose::respond(&self.ctx, &message, p).await,
            ProtocolParams::Install(p) => flows::install::respond(&self.ctx, &message, p).await,
            ProtocolParams::Update(p) => flows::update::respond(&self.ctx, &message, p).await,
            ProtocolParams::TakeAction(p) => {
                flows::take_action::respond(&self.ctx, &message, p).await
            }
            ProtocolParams::Uninstall(p) => flows::uninstall::respond(&self.ctx, &message, p).await,
        };
        if let Err(e) = &result {
            warn!(
                process_id = %message.process_id,
                %protocol,
                error = %e,
                "[sc-05] protocol failed as responder"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pair, pair_with, Node, MULTISIG, TOKEN};
    use primitive_types::U256;
    use sc_01_channel_model::{AppAbiEncodings, ModelError, OutcomeType};
    use sc_02_commitments::{CommitmentError, CommitmentRecord};
    use sc_04_instruction_executor::{
        ExecutorError, InstallParams, ProposeParams, SetupParams, TakeActionParams,
        UninstallParams, UpdateParams,
    };
    use serde_json::json;
    use shared_types::{Address, Bytes32};

    fn setup_params(a: &Node, b: &Node) -> ProtocolParams {
        ProtocolParams::Setup(SetupParams {
            initiator_xpub: a.xpub.clone(),
            responder_xpub: b.xpub.clone(),
            multisig_address: MULTISIG,
        })
    }

    fn propose_params(a: &Node, b: &Node) -> ProposeParams {
        ProposeParams {
            initiator_xpub: a.xpub.clone(),
            responder_xpub: b.xpub.clone(),
            multisig_address: MULTISIG,
            app_definition: Address([0xAD; 20]),
            abi_encodings: AppAbiEncodings {
                state_encoding: "tuple(uint256 counter)".into(),
                action_encoding: Some("tuple(uint256 increment)".into()),
            },
            initiator_deposit: U256::from(5),
            initiator_deposit_token_address: TOKEN,
            responder_deposit: U256::from(5),
            responder_deposit_token_address: TOKEN,
            timeout: 100,
            initial_state: json!({ "counter": 0 }),
            outcome_type: OutcomeType::MultiAssetMultiPartyCoinTransfer,
            meta: None,
        }
    }

    async fn setup(a: &Node, b: &Node) {
        a.runner.initiate(setup_params(a, b)).await.unwrap();
    }

    /// Setup, fund both sides with 10, propose from A, install from B.
    async fn installed(a: &Node, b: &Node) -> Bytes32 {
        setup(a, b).await;
        a.fund(10);
        b.fund(10);
        let channel = a
            .runner
            .initiate(ProtocolParams::Propose(propose_params(a, b)))
            .await
            .unwrap();
        let proposal = channel.proposed_app_instances().values().next().unwrap().clone();
        let params =
            InstallParams::from_proposal(&proposal, MULTISIG, &b.xpub, &a.xpub, false).unwrap();
        b.runner.initiate(ProtocolParams::Install(params)).await.unwrap();
        proposal.identity_hash
    }

    fn balance(node: &Node, who: Address) -> U256 {
        node.channel().free_balance().unwrap().get_balance(&TOKEN, &who)
    }

    #[tokio::test]
    async fn test_setup_both_parties_agree() {
        let (a, b) = pair();
        let channel = a.runner.initiate(setup_params(&a, &b)).await.unwrap();

        assert_eq!(a.channel(), b.channel());
        assert_eq!(channel, a.channel());
        let fb = channel.free_balance_app_instance();
        assert_eq!(fb.latest_timeout, 172_800);
        assert!(channel.free_balance().unwrap().get_balance(&TOKEN, &a.address()).is_zero());

        for node in [&a, &b] {
            let commitments = node.store.commitments.lock();
            assert_eq!(commitments.len(), 1);
            let (record, _) = &commitments[0];
            assert!(matches!(record, CommitmentRecord::Setup(_)));
            assert_eq!(record.as_commitment().signatures().len(), 2);
            assert!(record.as_commitment().get_signed_transaction().is_ok());
        }
    }

    #[tokio::test]
    async fn test_initiate_runs_on_spawned_task() {
        let (a, b) = pair();
        let runner = a.runner.clone();
        let params = setup_params(&a, &b);
        let channel = tokio::spawn(async move { runner.initiate(params).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(channel, b.channel());
    }

    #[tokio::test]
    async fn test_setup_twice_rejected() {
        let (a, b) = pair();
        setup(&a, &b).await;
        assert_eq!(
            a.runner.initiate(setup_params(&a, &b)).await,
            Err(ProtocolError::ChannelAlreadyExists(MULTISIG))
        );
    }

    #[tokio::test]
    async fn test_propose_assigns_next_seq_no() {
        let (a, b) = pair();
        setup(&a, &b).await;
        let channel = a
            .runner
            .initiate(ProtocolParams::Propose(propose_params(&a, &b)))
            .await
            .unwrap();
        let proposal = channel.proposed_app_instances().values().next().unwrap();
        assert_eq!(proposal.app_seq_no, 1);
        assert_eq!(channel.num_proposed_apps(), 2);
        assert_eq!(a.channel(), b.channel());
    }

    #[tokio::test]
    async fn test_install_debits_both_deposits() {
        let (a, b) = pair();
        let app = installed(&a, &b).await;

        assert_eq!(a.channel(), b.channel());
        let channel = a.channel();
        assert!(channel.is_app_instance_installed(&app));
        assert!(channel.proposed_app_instances().is_empty());
        assert!(channel.free_balance().unwrap().has_active_app(&app));
        assert_eq!(balance(&a, a.address()), U256::from(5));
        assert_eq!(balance(&a, b.address()), U256::from(5));

        let kinds: Vec<_> = b.store.commitments.lock().iter().map(|(c, _)| c.kind()).collect();
        assert!(kinds.contains(&sc_02_commitments::CommitmentKind::Conditional));
    }

    #[tokio::test]
    async fn test_install_without_funds_fails_before_sending() {
        let (a, b) = pair();
        setup(&a, &b).await;
        let channel = a
            .runner
            .initiate(ProtocolParams::Propose(propose_params(&a, &b)))
            .await
            .unwrap();
        let proposal = channel.proposed_app_instances().values().next().unwrap().clone();
        let params =
            InstallParams::from_proposal(&proposal, MULTISIG, &b.xpub, &a.xpub, false).unwrap();

        let err = b.runner.initiate(ProtocolParams::Install(params)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Model(ModelError::NegativeBalance { .. })));
        assert_eq!(a.channel().proposed_app_instances().len(), 1);
        assert_eq!(b.channel().proposed_app_instances().len(), 1);
    }

    #[tokio::test]
    async fn test_update_bumps_version_once() {
        let (a, b) = pair();
        let app = installed(&a, &b).await;
        let before = a.channel().get_app_instance(&app).unwrap().clone();

        a.runner
            .initiate(ProtocolParams::Update(UpdateParams {
                initiator_xpub: a.xpub.clone(),
                responder_xpub: b.xpub.clone(),
                multisig_address: MULTISIG,
                app_identity_hash: app,
                new_state: json!({ "counter": 7 }),
            }))
            .await
            .unwrap();

        let after = b.channel().get_app_instance(&app).unwrap().clone();
        assert_eq!(after.latest_version_number, before.latest_version_number + 1);
        assert_eq!(after.latest_state, json!({ "counter": 7 }));
        assert_eq!(after.identity_hash(), before.identity_hash());
        assert_eq!(after.interpreter_params, before.interpreter_params);
        assert_eq!(a.channel(), b.channel());
    }

    #[tokio::test]
    async fn test_take_action_applies_transition() {
        let (a, b) = pair();
        let app = installed(&a, &b).await;

        a.runner
            .initiate(ProtocolParams::TakeAction(TakeActionParams {
                initiator_xpub: a.xpub.clone(),
                responder_xpub: b.xpub.clone(),
                multisig_address: MULTISIG,
                app_identity_hash: app,
                action: json!({ "increment": 3 }),
            }))
            .await
            .unwrap();

        for node in [&a, &b] {
            let channel = node.channel();
            let state = &channel.get_app_instance(&app).unwrap().latest_state;
            assert_eq!(state["counter"], 3);
        }
    }

    #[tokio::test]
    async fn test_uninstall_restores_free_balance() {
        let (a, b) = pair();
        let app = installed(&a, &b).await;
        for node in [&a, &b] {
            node.chain.pay(&[(a.address(), 5), (b.address(), 5)]);
        }

        a.runner
            .initiate(ProtocolParams::Uninstall(UninstallParams {
                initiator_xpub: a.xpub.clone(),
                responder_xpub: b.xpub.clone(),
                multisig_address: MULTISIG,
                app_identity_hash: app,
                block_number_to_use_if_necessary: None,
            }))
            .await
            .unwrap();

        assert_eq!(a.channel(), b.channel());
        assert!(!a.channel().is_app_instance_installed(&app));
        assert_eq!(balance(&b, a.address()), U256::from(10));
        assert_eq!(balance(&b, b.address()), U256::from(10));
    }

    #[tokio::test]
    async fn test_free_balance_cannot_be_uninstalled() {
        let (a, b) = pair();
        setup(&a, &b).await;
        let fb = a.channel().free_balance_app_instance().identity_hash();
        let err = a
            .runner
            .initiate(ProtocolParams::Uninstall(UninstallParams {
                initiator_xpub: a.xpub.clone(),
                responder_xpub: b.xpub.clone(),
                multisig_address: MULTISIG,
                app_identity_hash: fb,
                block_number_to_use_if_necessary: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Cannot uninstall the FreeBalance of channel: {MULTISIG}")
        );
    }

    #[tokio::test]
    async fn test_bad_responder_signature_persists_nothing() {
        let (a, b) = pair_with(9);
        let err = a.runner.initiate(setup_params(&a, &b)).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Commitment(CommitmentError::InvalidSignature { .. })
        ));
        assert!(a.store.channels.lock().is_empty());
        assert!(a.store.commitments.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_initiator_signature_aborts_both() {
        // B signs as someone else, so A never gets a reply it accepts and
        // B, as initiator, is rejected by A before A persists anything.
        let (a, b) = pair_with(9);
        let err = b
            .runner
            .initiate(ProtocolParams::Setup(SetupParams {
                initiator_xpub: b.xpub.clone(),
                responder_xpub: a.xpub.clone(),
                multisig_address: MULTISIG,
            }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Executor(ExecutorError::Handler { .. })
        ));
        assert!(a.store.channels.lock().is_empty());
        assert!(b.store.channels.lock().is_empty());
    }

    #[tokio::test]
    async fn test_only_the_initiator_initiates() {
        let (a, b) = pair();
        let err = a.runner.initiate(setup_params(&b, &a)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::NotInitiator { .. }));
    }

    #[tokio::test]
    async fn test_respond_rejects_replies() {
        let (a, b) = pair();
        let message = ProtocolMessage {
            process_id: "p".into(),
            params: setup_params(&a, &b),
            to_xpub: b.xpub.clone(),
            seq: -1,
            custom_data: Default::default(),
        };
        assert!(matches!(
            b.runner.respond(message).await,
            Err(ProtocolError::UnexpectedSeq { seq: -1, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_channel_named_in_error() {
        let (a, b) = pair();
        let err = a
            .runner
            .initiate(ProtocolParams::Propose(propose_params(&a, &b)))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Call to getStateChannel failed when searching for multisig address"));
    }
}
