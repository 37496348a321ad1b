//! Proposing, installing and rejecting apps.

use super::{counterparty, lock_names, remove_proposal, require_app_id};
use crate::adapters::BusMessage;
use crate::container::Node;
use crate::errors::NodeError;
use primitive_types::U256;
use sc_01_channel_model::{AppAbiEncodings, AppInstance, ModelError, OutcomeType, StateChannel};
use sc_04_instruction_executor::{InstallParams, ProposeParams, ProtocolParams};
use sc_05_protocol_flows::ProtocolRunnerApi;
use serde_json::Value;
use shared_crypto::xkey_kth_address;
use shared_types::{Address, Bytes32};
use tracing::info;

/// Arguments of `propose_install`. The counterparty is the channel's
/// other member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposeInstallRequest {
    /// Channel to install into.
    pub multisig_address: Address,
    /// App definition contract.
    pub app_definition: Address,
    /// State and action encodings.
    pub abi_encodings: AppAbiEncodings,
    /// Our deposit.
    pub initiator_deposit: U256,
    /// Token of our deposit.
    pub initiator_deposit_token_address: Address,
    /// Counterparty's deposit.
    pub responder_deposit: U256,
    /// Token of the counterparty's deposit.
    pub responder_deposit_token_address: Address,
    /// Default timeout in blocks.
    pub timeout: u64,
    /// Initial state.
    pub initial_state: Value,
    /// Outcome type.
    pub outcome_type: OutcomeType,
    /// Opaque metadata.
    pub meta: Option<Value>,
}

/// Fails unless `xpub`'s index-0 address holds `amount` of `token`.
fn ensure_funds(
    channel: &StateChannel,
    xpub: &str,
    token: Address,
    amount: U256,
) -> Result<(), NodeError> {
    let balance = channel
        .free_balance()?
        .get_balance(&token, &xkey_kth_address(xpub, 0)?);
    if balance < amount {
        return Err(NodeError::InsufficientFunds {
            identifier: xpub.to_string(),
            multisig: channel.multisig_address(),
            token,
            balance,
            allocation: amount,
        });
    }
    Ok(())
}

impl Node {
    /// Propose an app to the channel's other member. Returns the
    /// proposal's identity hash.
    pub async fn propose_install(&self, request: ProposeInstallRequest) -> Result<Bytes32, NodeError> {
        if request.outcome_type == OutcomeType::TwoPartyFixedOutcome
            && request.initiator_deposit_token_address != request.responder_deposit_token_address
        {
            return Err(ModelError::MixedDepositAssets {
                outcome_type: request.outcome_type.as_str().to_string(),
                first: request.initiator_deposit_token_address,
                second: request.responder_deposit_token_address,
            }
            .into());
        }

        let multisig = request.multisig_address;
        let _guard = self.locks.acquire(lock_names(multisig, None)).await;
        let pre = self.get_state_channel(multisig).await?;
        let responder = counterparty(&pre, &self.public_identifier)?;
        let params = ProposeParams {
            initiator_xpub: self.public_identifier.clone(),
            responder_xpub: responder,
            multisig_address: multisig,
            app_definition: request.app_definition,
            abi_encodings: request.abi_encodings,
            initiator_deposit: request.initiator_deposit,
            initiator_deposit_token_address: request.initiator_deposit_token_address,
            responder_deposit: request.responder_deposit,
            responder_deposit_token_address: request.responder_deposit_token_address,
            timeout: request.timeout,
            initial_state: request.initial_state,
            outcome_type: request.outcome_type,
            meta: request.meta,
        };

        // Rejects empty and unencodable initial states.
        let app_seq_no = pre.num_proposed_apps();
        let hash = params
            .to_proposal(app_seq_no)
            .with_computed_identity_hash()?
            .identity_hash;
        ensure_funds(
            &pre,
            &params.initiator_xpub,
            params.initiator_deposit_token_address,
            params.initiator_deposit,
        )?;
        ensure_funds(
            &pre,
            &params.responder_xpub,
            params.responder_deposit_token_address,
            params.responder_deposit,
        )?;

        self.runner.initiate(ProtocolParams::Propose(params)).await?;
        info!(%multisig, app = %hash, app_seq_no, "[node] app proposed");
        Ok(hash)
    }

    /// Accept the held proposal `app`, installing it.
    pub async fn install(&self, app: Bytes32, disable_limit: bool) -> Result<AppInstance, NodeError> {
        let app = require_app_id(app, "install")?;
        let multisig = self
            .store
            .channel_for_proposal(&app)
            .ok_or(ModelError::ProposalNotFound(app))?
            .multisig_address();

        let _guard = self.locks.acquire(lock_names(multisig, Some(app))).await;
        let pre = self.get_state_channel(multisig).await?;
        let proposal = pre.get_proposal(&app)?;
        let responder = counterparty(&pre, &self.public_identifier)?;
        let params = InstallParams::from_proposal(
            proposal,
            multisig,
            &self.public_identifier,
            &responder,
            disable_limit,
        )?;
        ensure_funds(
            &pre,
            &self.public_identifier,
            params.initiator_deposit_token_address,
            params.initiator_balance_decrement,
        )?;

        let post = self.runner.initiate(ProtocolParams::Install(params)).await?;
        Ok(post.get_app_instance(&app)?.clone())
    }

    /// Drop the held proposal `app` and tell the counterparty to drop it.
    pub async fn reject_install(&self, app: Bytes32) -> Result<(), NodeError> {
        let app = require_app_id(app, "reject")?;
        let channel = self
            .store
            .channel_for_proposal(&app)
            .ok_or(ModelError::ProposalNotFound(app))?;
        let multisig = channel.multisig_address();
        let them = counterparty(&channel, &self.public_identifier)?;

        let _guard = self.locks.acquire(lock_names(multisig, Some(app))).await;
        remove_proposal(
            self.runner.context(),
            &self.store,
            &self.public_identifier,
            multisig,
            app,
        )
        .await?;
        self.bus.deliver(
            &them,
            BusMessage::RejectInstall {
                from: self.public_identifier.clone(),
                multisig,
                app_identity_hash: app,
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counter_proposal, funded_pair, pair, settle, MULTISIG, TOKEN};

    #[tokio::test]
    async fn test_propose_then_install_debits_both() {
        let (a, b) = funded_pair(10).await;
        let app = a.node.propose_install(counter_proposal(5, 5)).await.unwrap();
        assert_eq!(b.node.get_proposed_app_instances(MULTISIG).await.unwrap().len(), 1);

        let installed = b.node.install(app, false).await.unwrap();
        assert_eq!(installed.identity_hash(), app);

        for node in [&a.node, &b.node] {
            let fb = node.get_free_balance_state(MULTISIG, TOKEN).await.unwrap();
            assert!(fb.values().all(|v| *v == U256::from(5)));
            assert!(node.get_proposed_app_instances(MULTISIG).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_propose_rejects_empty_state() {
        let (a, _b) = funded_pair(10).await;
        let mut request = counter_proposal(1, 1);
        request.initial_state = serde_json::json!({});
        let err = a.node.propose_install(request).await.unwrap_err();
        assert_eq!(err.to_string(), "A proposed AppInstance cannot have an empty initial state");
    }

    #[tokio::test]
    async fn test_propose_rejects_mixed_tokens_for_fixed_outcome() {
        let (a, _b) = funded_pair(10).await;
        let mut request = counter_proposal(1, 1);
        request.outcome_type = OutcomeType::TwoPartyFixedOutcome;
        request.responder_deposit_token_address = Address([0x71; 20]);
        let err = a.node.propose_install(request).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("For a TWO_PARTY_FIXED_OUTCOME there cannot be two kinds of tokens deposited"));
    }

    #[tokio::test]
    async fn test_propose_checks_both_balances() {
        let (a, b) = funded_pair(10).await;
        let err = a.node.propose_install(counter_proposal(1, 11)).await.unwrap_err();
        let NodeError::InsufficientFunds { identifier, allocation, .. } = err else {
            panic!("expected insufficient funds, got {err}");
        };
        assert_eq!(identifier, b.node.public_identifier());
        assert_eq!(allocation, U256::from(11));
    }

    #[tokio::test]
    async fn test_install_unknown_or_missing_id() {
        let (a, _b) = pair();
        assert_eq!(
            a.node.install(Bytes32::ZERO, false).await,
            Err(NodeError::NoAppInstanceId("install"))
        );
        let err = a.node.install(Bytes32([7; 32]), false).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("No proposed AppInstance exists for the given appInstanceId"));
    }

    #[tokio::test]
    async fn test_reject_removes_proposal_on_both_sides() {
        let (a, b) = funded_pair(10).await;
        let app = a.node.propose_install(counter_proposal(5, 5)).await.unwrap();

        b.node.reject_install(app).await.unwrap();
        assert!(b.node.get_proposed_app_instances(MULTISIG).await.unwrap().is_empty());

        let proposer = &a.node;
        settle(|| async move {
            proposer.get_proposed_app_instances(MULTISIG).await.unwrap().is_empty()
        })
        .await;
        assert!(b.node.install(app, false).await.is_err());
    }
}
