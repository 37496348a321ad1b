//! Channel creation, multisig deployment and deposit rights.

use super::{counterparty, lock_names};
use crate::container::Node;
use crate::errors::NodeError;
use primitive_types::U256;
use sc_01_channel_model::{StateChannel, CONVENTION_FOR_ETH_TOKEN_ADDRESS};
use sc_04_instruction_executor::{ProtocolParams, SetupParams};
use sc_05_protocol_flows::ProtocolRunnerApi;
use shared_crypto::ExtendedPublicKey;
use shared_types::Address;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Result of `rescind_deposit_rights`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescindDepositRights {
    /// The multisig's on-chain balance in `token_address`.
    pub multisig_balance: U256,
    /// Token the balance was read in.
    pub token_address: Address,
}

impl Node {
    /// Run setup with `counterparty` for the channel at `multisig`.
    pub async fn create_channel(
        &self,
        counterparty: &str,
        multisig: Address,
    ) -> Result<StateChannel, NodeError> {
        ExtendedPublicKey::from_str(counterparty)?;
        if counterparty == self.public_identifier {
            return Err(NodeError::SelfChannel(counterparty.to_string()));
        }

        let _guard = self.locks.acquire(lock_names(multisig, None)).await;
        let channel = self
            .runner
            .initiate(ProtocolParams::Setup(SetupParams {
                initiator_xpub: self.public_identifier.clone(),
                responder_xpub: counterparty.to_string(),
                multisig_address: multisig,
            }))
            .await?;
        info!(%multisig, "[node] channel created");
        Ok(channel)
    }

    /// Deploy the multisig backing `multisig`'s channel, retrying with
    /// linear backoff until the chain reports the channel's owners.
    pub async fn deploy_state_deposit_holder(&self, multisig: Address) -> Result<(), NodeError> {
        let _guard = self.locks.acquire(lock_names(multisig, None)).await;
        let channel = self
            .store
            .channel(&multisig)
            .ok_or(NodeError::ChannelNotFound(multisig))?;
        let expected = channel.multisig_owners()?;

        if self.deployer.is_deployed(&multisig).await? {
            info!(%multisig, "[node] multisig already deployed");
            return Ok(());
        }

        let retries = self.config.deploy.retry_count;
        let mut last_error = String::from("no deployment attempted");
        for attempt in 1..=retries {
            match self.deployer.deploy(&multisig, &expected).await {
                Ok(()) => match self.deployer.owners(&multisig).await {
                    Ok(owners) if owners == expected => {
                        info!(%multisig, attempt, "[node] multisig deployed");
                        return Ok(());
                    }
                    Ok(owners) => {
                        last_error = format!(
                            "multisig {multisig} reports owners {owners:?}, expected {expected:?}"
                        );
                    }
                    Err(e) => last_error = e.to_string(),
                },
                Err(e) => last_error = e.to_string(),
            }
            warn!(%multisig, attempt, error = %last_error, "[node] multisig deployment attempt failed");
            if attempt < retries {
                tokio::time::sleep(self.config.deploy.backoff_unit * attempt).await;
            }
        }

        Err(NodeError::ChannelCreationFailed {
            multisig,
            last_error,
        })
    }

    /// Report the multisig's balance in `token` (ETH when `None`) and
    /// uninstall the channel's coin balance refund app, if one is
    /// installed, settling at the current block.
    pub async fn rescind_deposit_rights(
        &self,
        multisig: Address,
        token: Option<Address>,
    ) -> Result<RescindDepositRights, NodeError> {
        let token_address = token.unwrap_or(CONVENTION_FOR_ETH_TOKEN_ADDRESS);
        let _guard = self.locks.acquire(lock_names(multisig, None)).await;
        let multisig_balance = self.balances.balance_of(&multisig, &token_address).await?;
        let result = RescindDepositRights {
            multisig_balance,
            token_address,
        };

        let channel = self.get_state_channel(multisig).await?;
        let refund_definition = self.config.network.coin_balance_refund_app;
        let Some(refund_app) = channel
            .app_instances()
            .values()
            .find(|app| app.app_interface.addr == refund_definition)
            .map(|app| app.identity_hash())
        else {
            debug!(%multisig, "[node] no refund app to rescind");
            return Ok(result);
        };

        let block = self.runner.context().chain.block_number().await?;
        let responder = counterparty(&channel, &self.public_identifier)?;
        self.run_uninstall(multisig, responder, refund_app, Some(block))
            .await?;
        info!(%multisig, app = %refund_app, block, "[node] deposit rights rescinded");
        Ok(result)
    }
}
