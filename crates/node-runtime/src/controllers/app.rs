//! Updating, acting on and uninstalling installed apps.

use super::{counterparty, lock_names, require_app_id};
use crate::container::Node;
use crate::errors::NodeError;
use sc_01_channel_model::{ModelError, StateChannel};
use sc_04_instruction_executor::{ProtocolParams, TakeActionParams, UninstallParams, UpdateParams};
use sc_05_protocol_flows::ProtocolRunnerApi;
use serde_json::Value;
use shared_types::{Address, Bytes32};
use tracing::info;

impl Node {
    /// The channel holding installed app `app`, with the counterparty.
    fn channel_with_app(&self, app: &Bytes32) -> Result<(StateChannel, String), NodeError> {
        let channel = self
            .store
            .channel_for_app(app)
            .ok_or(ModelError::AppNotInstalled(*app))?;
        let them = counterparty(&channel, &self.public_identifier)?;
        Ok((channel, them))
    }

    /// Replace `app`'s state with `new_state`. Returns the agreed state.
    pub async fn update_state(&self, app: Bytes32, new_state: Value) -> Result<Value, NodeError> {
        let app = require_app_id(app, "update")?;
        let (channel, responder) = self.channel_with_app(&app)?;
        let multisig = channel.multisig_address();

        let _guard = self.locks.acquire(lock_names(multisig, Some(app))).await;
        let post = self
            .runner
            .initiate(ProtocolParams::Update(UpdateParams {
                initiator_xpub: self.public_identifier.clone(),
                responder_xpub: responder,
                multisig_address: multisig,
                app_identity_hash: app,
                new_state,
            }))
            .await?;
        Ok(post.get_app_instance(&app)?.latest_state.clone())
    }

    /// Apply `action` to `app`. Returns the agreed state.
    pub async fn take_action(&self, app: Bytes32, action: Value) -> Result<Value, NodeError> {
        let app = require_app_id(app, "takeAction on")?;
        let (channel, responder) = self.channel_with_app(&app)?;
        let multisig = channel.multisig_address();

        let _guard = self.locks.acquire(lock_names(multisig, Some(app))).await;
        let post = self
            .runner
            .initiate(ProtocolParams::TakeAction(TakeActionParams {
                initiator_xpub: self.public_identifier.clone(),
                responder_xpub: responder,
                multisig_address: multisig,
                app_identity_hash: app,
                action,
            }))
            .await?;
        Ok(post.get_app_instance(&app)?.latest_state.clone())
    }

    /// Pay out and remove `app`.
    ///
    /// `block_number_to_use_if_necessary` lets a refund app with a zero
    /// payout settle once the chain is past that block.
    pub async fn uninstall(
        &self,
        app: Bytes32,
        block_number_to_use_if_necessary: Option<u64>,
    ) -> Result<StateChannel, NodeError> {
        let app = require_app_id(app, "uninstall")?;
        let Some(channel) = self.store.channel_for_app(&app) else {
            if self.store.channel_for_proposal(&app).is_some() {
                return Err(ModelError::AppNotInstalled(app).into());
            }
            if self.store.is_uninstalled(&app) {
                return Err(NodeError::AlreadyUninstalled(app));
            }
            return Err(NodeError::NoChannelForApp(app));
        };
        let multisig = channel.multisig_address();
        if channel.free_balance_app_instance().identity_hash() == app {
            return Err(ModelError::FreeBalanceNotAllowed(multisig).into());
        }
        let responder = counterparty(&channel, &self.public_identifier)?;

        let _guard = self.locks.acquire(lock_names(multisig, Some(app))).await;
        self.run_uninstall(multisig, responder, app, block_number_to_use_if_necessary)
            .await
    }

    /// Run the uninstall protocol. The caller holds the locks.
    pub(crate) async fn run_uninstall(
        &self,
        multisig: Address,
        responder: String,
        app: Bytes32,
        block_number_to_use_if_necessary: Option<u64>,
    ) -> Result<StateChannel, NodeError> {
        let post = self
            .runner
            .initiate(ProtocolParams::Uninstall(UninstallParams {
                initiator_xpub: self.public_identifier.clone(),
                responder_xpub: responder,
                multisig_address: multisig,
                app_identity_hash: app,
                block_number_to_use_if_necessary,
            }))
            .await?;
        info!(%multisig, %app, "[node] app uninstalled");
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counter_proposal, funded_pair, installed_counter, MULTISIG, TOKEN};
    use primitive_types::U256;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_state_bumps_version_on_both() {
        let (a, b) = funded_pair(10).await;
        let app = installed_counter(&a, &b, 1, 1).await;

        let state = a.node.update_state(app, json!({ "counter": 7 })).await.unwrap();
        assert_eq!(state, json!({ "counter": 7 }));
        for node in [&a.node, &b.node] {
            let instance = node.get_app_instance(app).await.unwrap();
            assert_eq!(instance.latest_version_number, 1);
            assert_eq!(instance.latest_state, json!({ "counter": 7 }));
        }
    }

    #[tokio::test]
    async fn test_take_action_runs_app_logic() {
        let (a, b) = funded_pair(10).await;
        let app = installed_counter(&a, &b, 1, 1).await;

        let state = b.node.take_action(app, json!({ "increment": 4 })).await.unwrap();
        assert_eq!(state, json!({ "counter": 4 }));
        assert_eq!(a.node.get_app_instance(app).await.unwrap().latest_state, state);
    }

    #[tokio::test]
    async fn test_uninstall_pays_out_outcome() {
        let (a, b) = funded_pair(10).await;
        let app = installed_counter(&a, &b, 5, 5).await;
        // counter >= 10 pays everything to the first participant
        a.node.take_action(app, json!({ "increment": 10 })).await.unwrap();

        let post = a.node.uninstall(app, None).await.unwrap();
        assert!(post.app_instances().is_empty());

        let balances = b.node.get_free_balance_state(MULTISIG, TOKEN).await.unwrap();
        let mut amounts: Vec<U256> = balances.values().copied().collect();
        amounts.sort();
        assert_eq!(amounts, vec![U256::from(5), U256::from(15)]);
    }

    #[tokio::test]
    async fn test_uninstall_errors() {
        let (a, b) = funded_pair(10).await;
        assert_eq!(
            a.node.uninstall(Bytes32::ZERO, None).await.unwrap_err().to_string(),
            "No AppInstanceId specified to uninstall"
        );

        let fb = a.node.get_state_channel(MULTISIG).await.unwrap().free_balance_app_instance().identity_hash();
        assert_eq!(
            a.node.uninstall(fb, None).await.unwrap_err().to_string(),
            format!("Cannot uninstall the FreeBalance of channel: {MULTISIG}")
        );

        let proposed = a.node.propose_install(counter_proposal(1, 1)).await.unwrap();
        assert_eq!(
            a.node.uninstall(proposed, None).await,
            Err(NodeError::Model(ModelError::AppNotInstalled(proposed)))
        );

        b.node.install(proposed, false).await.unwrap();
        a.node.uninstall(proposed, None).await.unwrap();
        assert_eq!(
            a.node.uninstall(proposed, None).await.unwrap_err().to_string(),
            format!("Cannot uninstall app {proposed}, it has already been uninstalled")
        );
    }

    #[tokio::test]
    async fn test_take_action_requires_id() {
        let (a, _b) = funded_pair(10).await;
        assert_eq!(
            a.node.take_action(Bytes32::ZERO, json!({})).await,
            Err(NodeError::NoAppInstanceId("takeAction on"))
        );
    }

    #[tokio::test]
    async fn test_uninstall_rejected_proposal_is_not_already_uninstalled() {
        let (a, b) = funded_pair(10).await;
        let app = a.node.propose_install(counter_proposal(1, 1)).await.unwrap();
        b.node.reject_install(app).await.unwrap();

        assert_eq!(
            b.node.uninstall(app, None).await,
            Err(NodeError::NoChannelForApp(app))
        );
    }
}
