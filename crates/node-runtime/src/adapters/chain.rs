//! # In-Memory Chain
//!
//! Stands in for an Ethereum provider. App definitions are [`AppLogic`]
//! implementations registered by address; multisig deployments are
//! recorded with their owners. Failures can be scripted for tests.

use crate::ports::{BalanceReader, StateDepositHolderDeployer};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use primitive_types::U256;
use sc_01_channel_model::AppInstance;
use sc_03_outcome_interpreter::{ChainError, ChainReader};
use serde_json::Value;
use shared_types::Address;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The pure functions of an app definition contract.
pub trait AppLogic: Send + Sync {
    /// `applyAction(state, action)`.
    fn apply_action(&self, state: &Value, action: &Value) -> Result<Value, String>;

    /// `computeOutcome(state)`, ABI-encoded.
    fn compute_outcome(&self, app: &AppInstance) -> Result<Vec<u8>, String>;
}

/// Chain state held in memory.
#[derive(Default)]
pub struct MemoryChain {
    apps: DashMap<Address, Arc<dyn AppLogic>>,
    multisigs: DashMap<Address, Vec<Address>>,
    balances: DashMap<(Address, Address), U256>,
    block: AtomicU64,
    /// Deployments still to fail before one succeeds.
    failing_deploys: AtomicU32,
    /// Owners recorded instead of the requested ones, if set.
    owner_override: Mutex<Option<Vec<Address>>>,
}

impl MemoryChain {
    /// An empty chain at block 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `logic` as the app definition at `address`.
    pub fn register_app(&self, address: Address, logic: Arc<dyn AppLogic>) {
        self.apps.insert(address, logic);
    }

    /// Advance the block number by `blocks`.
    pub fn mine(&self, blocks: u64) {
        self.block.fetch_add(blocks, Ordering::SeqCst);
    }

    /// Set `holder`'s balance in `token`.
    pub fn set_balance(&self, holder: Address, token: Address, amount: U256) {
        self.balances.insert((holder, token), amount);
    }

    /// Make the next `count` deployments fail.
    pub fn fail_next_deploys(&self, count: u32) {
        self.failing_deploys.store(count, Ordering::SeqCst);
    }

    /// Record `owners` on every deployment regardless of the request.
    pub fn override_deployed_owners(&self, owners: Option<Vec<Address>>) {
        *self.owner_override.lock() = owners;
    }

    fn logic(&self, app: &AppInstance) -> Result<Arc<dyn AppLogic>, ChainError> {
        let definition = app.app_interface.addr;
        self.apps
            .get(&definition)
            .map(|l| l.clone())
            .ok_or(ChainError::UnknownAppDefinition(definition))
    }
}

#[async_trait]
impl ChainReader for MemoryChain {
    async fn compute_outcome(&self, app: &AppInstance) -> Result<Vec<u8>, ChainError> {
        self.logic(app)?
            .compute_outcome(app)
            .map_err(|reason| ChainError::Reverted {
                app_definition: app.app_interface.addr,
                reason,
            })
    }

    async fn compute_state_transition(
        &self,
        app: &AppInstance,
        action: &Value,
    ) -> Result<Value, ChainError> {
        self.logic(app)?
            .apply_action(&app.latest_state, action)
            .map_err(|reason| ChainError::Reverted {
                app_definition: app.app_interface.addr,
                reason,
            })
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.block.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl StateDepositHolderDeployer for MemoryChain {
    async fn is_deployed(&self, multisig: &Address) -> Result<bool, ChainError> {
        Ok(self.multisigs.contains_key(multisig))
    }

    async fn deploy(&self, multisig: &Address, owners: &[Address]) -> Result<(), ChainError> {
        let remaining = self.failing_deploys.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_deploys.store(remaining - 1, Ordering::SeqCst);
            warn!(%multisig, "[node] scripted deployment failure");
            return Err(ChainError::Unavailable(format!(
                "proxy creation for {multisig} was not mined"
            )));
        }
        let recorded = self
            .owner_override
            .lock()
            .clone()
            .unwrap_or_else(|| owners.to_vec());
        self.multisigs.insert(*multisig, recorded);
        debug!(%multisig, "[node] multisig deployed");
        Ok(())
    }

    async fn owners(&self, multisig: &Address) -> Result<Vec<Address>, ChainError> {
        self.multisigs
            .get(multisig)
            .map(|o| o.clone())
            .ok_or_else(|| ChainError::Unavailable(format!("no multisig deployed at {multisig}")))
    }
}

#[async_trait]
impl BalanceReader for MemoryChain {
    async fn balance_of(&self, holder: &Address, token: &Address) -> Result<U256, ChainError> {
        Ok(self
            .balances
            .get(&(*holder, *token))
            .map(|b| *b)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Doubler;

    impl AppLogic for Doubler {
        fn apply_action(&self, state: &Value, _action: &Value) -> Result<Value, String> {
            let n = state["n"].as_u64().ok_or("bad state")?;
            Ok(json!({ "n": n * 2 }))
        }

        fn compute_outcome(&self, _app: &AppInstance) -> Result<Vec<u8>, String> {
            Err("not final".into())
        }
    }

    #[tokio::test]
    async fn test_deploy_records_owners_after_scripted_failures() {
        let chain = MemoryChain::new();
        let multisig = Address([0x4D; 20]);
        let owners = vec![Address([1; 20]), Address([2; 20])];
        chain.fail_next_deploys(1);

        assert!(chain.deploy(&multisig, &owners).await.is_err());
        assert!(!chain.is_deployed(&multisig).await.unwrap());
        chain.deploy(&multisig, &owners).await.unwrap();
        assert_eq!(chain.owners(&multisig).await.unwrap(), owners);
    }

    #[tokio::test]
    async fn test_unset_balance_reads_zero() {
        let chain = MemoryChain::new();
        let (holder, token) = (Address([0x4D; 20]), Address([0x70; 20]));
        assert_eq!(chain.balance_of(&holder, &token).await.unwrap(), U256::zero());
        chain.set_balance(holder, token, U256::from(7));
        assert_eq!(chain.balance_of(&holder, &token).await.unwrap(), U256::from(7));
        assert!(chain.balance_of(&holder, &Address::ZERO).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_block_number_advances() {
        let chain = MemoryChain::new();
        chain.mine(5);
        assert_eq!(chain.block_number().await.unwrap(), 5);
    }

    fn app(definition: Address) -> AppInstance {
        AppInstance {
            multisig_address: Address([0x4D; 20]),
            participants: vec![Address([1; 20]), Address([2; 20])],
            default_timeout: 10,
            app_interface: sc_01_channel_model::AppInterface {
                addr: definition,
                state_encoding: "tuple(uint256 n)".into(),
                action_encoding: None,
            },
            app_seq_no: 1,
            latest_state: json!({ "n": 21 }),
            latest_version_number: 0,
            latest_timeout: 10,
            interpreter_params: sc_01_channel_model::InterpreterParams::MultiAssetMultiParty(
                sc_01_channel_model::MultiAssetMultiPartyCoinTransferInterpreterParams {
                    limit: Vec::new(),
                    token_addresses: Vec::new(),
                },
            ),
            meta: None,
        }
    }

    #[tokio::test]
    async fn test_transition_dispatches_by_app_definition() {
        let chain = MemoryChain::new();
        chain.register_app(Address([0xAD; 20]), Arc::new(Doubler));

        let next = chain
            .compute_state_transition(&app(Address([0xAD; 20])), &json!({}))
            .await
            .unwrap();
        assert_eq!(next, json!({ "n": 42 }));

        let err = chain
            .compute_state_transition(&app(Address([0xEE; 20])), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::UnknownAppDefinition(Address([0xEE; 20])));
    }

    #[tokio::test]
    async fn test_outcome_revert_names_app_definition() {
        let chain = MemoryChain::new();
        chain.register_app(Address([0xAD; 20]), Arc::new(Doubler));
        let err = chain.compute_outcome(&app(Address([0xAD; 20]))).await.unwrap_err();
        assert!(matches!(err, ChainError::Reverted { reason, .. } if reason == "not final"));
    }
}
