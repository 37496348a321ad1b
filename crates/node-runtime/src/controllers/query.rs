//! Read-only getters over the node's store.

use crate::container::Node;
use crate::errors::NodeError;
use sc_01_channel_model::{AppInstance, AppInstanceProposal, ModelError, StateChannel};
use sc_05_protocol_flows::StateChannelReader;
use shared_types::{Address, Bytes32, CoinTransferMap};

impl Node {
    /// Multisig addresses of every stored channel.
    pub fn get_channel_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self
            .store
            .channels()
            .iter()
            .map(StateChannel::multisig_address)
            .collect();
        addresses.sort();
        addresses
    }

    /// The channel at `multisig`.
    pub async fn get_state_channel(&self, multisig: Address) -> Result<StateChannel, NodeError> {
        self.store
            .get_state_channel(&multisig)
            .await?
            .ok_or(NodeError::ChannelNotFound(multisig))
    }

    /// Installed app `app`, in whichever channel holds it.
    pub async fn get_app_instance(&self, app: Bytes32) -> Result<AppInstance, NodeError> {
        let channel = self
            .store
            .channel_for_app(&app)
            .ok_or(ModelError::AppNotInstalled(app))?;
        Ok(channel.get_app_instance(&app)?.clone())
    }

    /// Installed apps of `multisig`'s channel, free balance excluded.
    pub async fn get_app_instances(&self, multisig: Address) -> Result<Vec<AppInstance>, NodeError> {
        let channel = self.get_state_channel(multisig).await?;
        Ok(channel.app_instances().values().cloned().collect())
    }

    /// Pending proposals of `multisig`'s channel.
    pub async fn get_proposed_app_instances(
        &self,
        multisig: Address,
    ) -> Result<Vec<AppInstanceProposal>, NodeError> {
        let channel = self.get_state_channel(multisig).await?;
        Ok(channel.proposed_app_instances().values().cloned().collect())
    }

    /// Free balance of `multisig`'s channel in `token`, keyed by owner.
    ///
    /// An unseen token reports zero for both owners.
    pub async fn get_free_balance_state(
        &self,
        multisig: Address,
        token: Address,
    ) -> Result<CoinTransferMap, NodeError> {
        let channel = self.get_state_channel(multisig).await?;
        Ok(channel.free_balance()?.with_token_address(&token))
    }
}
