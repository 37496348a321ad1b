//! # State Channel
//!
//! The channel value both parties hold. Every transition returns a new
//! `StateChannel`; a failed transition leaves the receiver as it was.

use super::app_instance::AppInstance;
use super::errors::ModelError;
use super::free_balance::FreeBalance;
use super::invariants::{
    invariant_not_free_balance, invariant_participants_match, invariant_two_participants,
};
use super::proposal::AppInstanceProposal;
use super::value_objects::{
    AppInterface, CriticalStateChannelAddresses, InterpreterParams,
    MultiAssetMultiPartyCoinTransferInterpreterParams, CONVENTION_FOR_ETH_TOKEN_ADDRESS,
    FREE_BALANCE_APP_SEQ_NO, FREE_BALANCE_DEFAULT_TIMEOUT, FREE_BALANCE_INITIAL_STATE_TIMEOUT,
    FREE_BALANCE_STATE_ENCODING,
};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_crypto::xkeys_to_sorted_kth_addresses;
use shared_types::{Address, Bytes32, TokenIndexedIncrements};
use std::collections::BTreeMap;
use tracing::debug;

/// A two-party channel backed by one multisig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StateChannelJson", into = "StateChannelJson")]
pub struct StateChannel {
    multisig_address: Address,
    addresses: CriticalStateChannelAddresses,
    user_neutered_extended_keys: Vec<String>,
    app_instances: BTreeMap<Bytes32, AppInstance>,
    proposed_app_instances: BTreeMap<Bytes32, AppInstanceProposal>,
    free_balance_app_instance: AppInstance,
    monotonic_num_proposed_apps: u32,
}

impl StateChannel {
    /// A fresh channel with the free balance installed at sequence 0.
    ///
    /// The free balance holds zero ETH for both index-0 addresses, sorted
    /// ascending. Sequence 0 is taken, so the counter starts at 1.
    pub fn setup_channel(
        free_balance_app_definition: Address,
        addresses: CriticalStateChannelAddresses,
        multisig_address: Address,
        user_neutered_extended_keys: &[String],
    ) -> Result<Self, ModelError> {
        invariant_two_participants(user_neutered_extended_keys.len())?;
        let participants =
            xkeys_to_sorted_kth_addresses(user_neutered_extended_keys, FREE_BALANCE_APP_SEQ_NO)?;

        let free_balance = FreeBalance::with_funded_tokens(
            &participants,
            U256::zero(),
            &[CONVENTION_FOR_ETH_TOKEN_ADDRESS],
        );
        let free_balance_app_instance = AppInstance {
            multisig_address,
            participants,
            default_timeout: FREE_BALANCE_DEFAULT_TIMEOUT,
            app_interface: AppInterface {
                addr: free_balance_app_definition,
                state_encoding: FREE_BALANCE_STATE_ENCODING.to_string(),
                action_encoding: None,
            },
            app_seq_no: FREE_BALANCE_APP_SEQ_NO,
            latest_state: free_balance.to_state_json(),
            latest_version_number: 0,
            latest_timeout: FREE_BALANCE_INITIAL_STATE_TIMEOUT,
            interpreter_params: InterpreterParams::MultiAssetMultiParty(
                MultiAssetMultiPartyCoinTransferInterpreterParams {
                    limit: Vec::new(),
                    token_addresses: Vec::new(),
                },
            ),
            meta: None,
        };

        debug!(multisig = %multisig_address, "[sc-01] channel set up");

        Ok(Self {
            multisig_address,
            addresses,
            user_neutered_extended_keys: user_neutered_extended_keys.to_vec(),
            app_instances: BTreeMap::new(),
            proposed_app_instances: BTreeMap::new(),
            free_balance_app_instance,
            monotonic_num_proposed_apps: FREE_BALANCE_APP_SEQ_NO + 1,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Multisig address.
    pub fn multisig_address(&self) -> Address {
        self.multisig_address
    }

    /// Proxy factory and mastercopy.
    pub fn addresses(&self) -> CriticalStateChannelAddresses {
        self.addresses
    }

    /// Participant xpubs in the order given at setup.
    pub fn user_neutered_extended_keys(&self) -> &[String] {
        &self.user_neutered_extended_keys
    }

    /// Multisig owners: index-0 addresses, sorted ascending.
    pub fn multisig_owners(&self) -> Result<Vec<Address>, ModelError> {
        self.get_signing_keys_for(FREE_BALANCE_APP_SEQ_NO)
    }

    /// Signer addresses at `app_seq_no`, sorted ascending.
    pub fn get_signing_keys_for(&self, app_seq_no: u32) -> Result<Vec<Address>, ModelError> {
        Ok(xkeys_to_sorted_kth_addresses(
            &self.user_neutered_extended_keys,
            app_seq_no,
        )?)
    }

    /// The free balance app.
    pub fn free_balance_app_instance(&self) -> &AppInstance {
        &self.free_balance_app_instance
    }

    /// Decoded free balance ledger.
    pub fn free_balance(&self) -> Result<FreeBalance, ModelError> {
        FreeBalance::from_state_json(&self.free_balance_app_instance.latest_state)
    }

    /// Next sequence number to assign.
    pub fn num_proposed_apps(&self) -> u32 {
        self.monotonic_num_proposed_apps
    }

    /// Number of installed apps, excluding the free balance.
    pub fn num_active_apps(&self) -> usize {
        self.app_instances.len()
    }

    /// Installed apps keyed by identity hash.
    pub fn app_instances(&self) -> &BTreeMap<Bytes32, AppInstance> {
        &self.app_instances
    }

    /// Pending proposals keyed by identity hash.
    pub fn proposed_app_instances(&self) -> &BTreeMap<Bytes32, AppInstanceProposal> {
        &self.proposed_app_instances
    }

    /// Whether `app` is installed.
    pub fn is_app_instance_installed(&self, app: &Bytes32) -> bool {
        self.app_instances.contains_key(app)
    }

    /// Installed app, or the free balance if `app` is its identity hash.
    pub fn get_app_instance(&self, app: &Bytes32) -> Result<&AppInstance, ModelError> {
        if *app == self.free_balance_app_instance.identity_hash() {
            return Ok(&self.free_balance_app_instance);
        }
        self.app_instances
            .get(app)
            .ok_or(ModelError::AppNotInstalled(*app))
    }

    /// Pending proposal with identity hash `app`.
    pub fn get_proposal(&self, app: &Bytes32) -> Result<&AppInstanceProposal, ModelError> {
        self.proposed_app_instances
            .get(app)
            .ok_or(ModelError::ProposalNotFound(*app))
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Add `proposal` and advance the sequence counter.
    pub fn add_proposal(&self, proposal: AppInstanceProposal) -> Result<Self, ModelError> {
        let hash = proposal.identity_hash;
        if self.proposed_app_instances.contains_key(&hash) || self.app_instances.contains_key(&hash)
        {
            return Err(ModelError::DuplicateProposal(hash));
        }
        let mut next = self.clone();
        next.proposed_app_instances.insert(hash, proposal);
        next.monotonic_num_proposed_apps += 1;
        Ok(next)
    }

    /// Drop the proposal with identity hash `app`.
    pub fn remove_proposal(&self, app: &Bytes32) -> Result<Self, ModelError> {
        let mut next = self.clone();
        next.proposed_app_instances
            .remove(app)
            .ok_or(ModelError::ProposalNotFound(*app))?;
        Ok(next)
    }

    /// Install `app`, debiting the free balance by `increments`.
    ///
    /// Removes the matching proposal if present and marks the app active.
    pub fn install_app(
        &self,
        app: AppInstance,
        increments: &TokenIndexedIncrements,
    ) -> Result<Self, ModelError> {
        let hash = app.identity_hash();
        let fb_hash = self.free_balance_app_instance.identity_hash();
        invariant_not_free_balance(&hash, &fb_hash, self.multisig_address)?;
        if self.app_instances.contains_key(&hash) {
            return Err(ModelError::AppAlreadyInstalled(hash));
        }
        invariant_participants_match(
            hash,
            &self.get_signing_keys_for(app.app_seq_no)?,
            &app.participants,
        )?;

        let free_balance = self.free_balance()?.increment(increments)?.add_active_app(hash);

        let mut next = self.set_free_balance(&free_balance)?;
        next.proposed_app_instances.remove(&hash);
        next.app_instances.insert(hash, app);
        debug!(multisig = %self.multisig_address, app = %hash, "[sc-01] app installed");
        Ok(next)
    }

    /// Remove `app`, crediting the free balance by `increments`.
    pub fn uninstall_app(
        &self,
        app: &Bytes32,
        increments: &TokenIndexedIncrements,
    ) -> Result<Self, ModelError> {
        let fb_hash = self.free_balance_app_instance.identity_hash();
        invariant_not_free_balance(app, &fb_hash, self.multisig_address)?;
        if !self.app_instances.contains_key(app) {
            return Err(ModelError::AppNotInstalled(*app));
        }

        let free_balance = self
            .free_balance()?
            .remove_active_app(app)
            .increment(increments)?;

        let mut next = self.set_free_balance(&free_balance)?;
        next.app_instances.remove(app);
        debug!(multisig = %self.multisig_address, app = %app, "[sc-01] app uninstalled");
        Ok(next)
    }

    /// Replace the state of `app` (installed or the free balance).
    pub fn set_state(&self, app: &Bytes32, new_state: Value, timeout: u64) -> Result<Self, ModelError> {
        let updated = self.get_app_instance(app)?.set_state(new_state, timeout)?;
        Ok(self.with_app_instance(updated))
    }

    /// Write `free_balance` into the free balance app, bumping its version.
    pub fn set_free_balance(&self, free_balance: &FreeBalance) -> Result<Self, ModelError> {
        let fb = &self.free_balance_app_instance;
        let updated = fb.set_state(free_balance.to_state_json(), fb.latest_timeout)?;
        Ok(self.with_app_instance(updated))
    }

    fn with_app_instance(&self, app: AppInstance) -> Self {
        let mut next = self.clone();
        if app.identity_hash() == self.free_balance_app_instance.identity_hash() {
            next.free_balance_app_instance = app;
        } else {
            next.app_instances.insert(app.identity_hash(), app);
        }
        next
    }
}

/// Persisted and transmitted shape of a [`StateChannel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChannelJson {
    multisig_address: Address,
    addresses: CriticalStateChannelAddresses,
    user_neutered_extended_keys: Vec<String>,
    app_instances: Vec<(Bytes32, AppInstance)>,
    proposed_app_instances: Vec<(Bytes32, AppInstanceProposal)>,
    free_balance_app_instance: AppInstance,
    monotonic_num_proposed_apps: u32,
}

impl From<StateChannel> for StateChannelJson {
    fn from(channel: StateChannel) -> Self {
        Self {
            multisig_address: channel.multisig_address,
            addresses: channel.addresses,
            user_neutered_extended_keys: channel.user_neutered_extended_keys,
            app_instances: channel.app_instances.into_iter().collect(),
            proposed_app_instances: channel.proposed_app_instances.into_iter().collect(),
            free_balance_app_instance: channel.free_balance_app_instance,
            monotonic_num_proposed_apps: channel.monotonic_num_proposed_apps,
        }
    }
}

impl TryFrom<StateChannelJson> for StateChannel {
    type Error = ModelError;

    fn try_from(json: StateChannelJson) -> Result<Self, Self::Error> {
        invariant_two_participants(json.user_neutered_extended_keys.len())?;
        let app_instances = json
            .app_instances
            .into_iter()
            .map(|(hash, app)| {
                let computed = app.identity_hash();
                if computed != hash {
                    return Err(ModelError::IdentityHashMismatch {
                        stored: hash,
                        computed,
                    });
                }
                Ok((hash, app))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self {
            multisig_address: json.multisig_address,
            addresses: json.addresses,
            user_neutered_extended_keys: json.user_neutered_extended_keys,
            app_instances,
            proposed_app_instances: json.proposed_app_instances.into_iter().collect(),
            free_balance_app_instance: json.free_balance_app_instance,
            monotonic_num_proposed_apps: json.monotonic_num_proposed_apps,
        })
    }
}
