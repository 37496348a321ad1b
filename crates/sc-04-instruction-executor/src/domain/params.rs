//! # Protocol Parameters
//!
//! One parameter record per protocol, as carried in the message envelope.
//! Both parties derive the post-protocol state from these alone.

use primitive_types::U256;
use sc_01_channel_model::{
    AppAbiEncodings, AppInstanceProposal, AppInterface, ModelError, OutcomeType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{hex_amount, Address, Bytes32};

/// `setup`: create the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupParams {
    /// Initiator's xpub.
    pub initiator_xpub: String,
    /// Responder's xpub.
    pub responder_xpub: String,
    /// Multisig backing the channel.
    pub multisig_address: Address,
}

/// `propose`: offer an app for installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeParams {
    /// Initiator's xpub (the proposer).
    pub initiator_xpub: String,
    /// Responder's xpub.
    pub responder_xpub: String,
    /// Channel multisig.
    pub multisig_address: Address,
    /// App definition contract.
    pub app_definition: Address,
    /// State and action encodings.
    pub abi_encodings: AppAbiEncodings,
    /// Proposer's deposit.
    #[serde(with = "hex_amount")]
    pub initiator_deposit: U256,
    /// Token of the proposer's deposit.
    pub initiator_deposit_token_address: Address,
    /// Counterparty's deposit.
    #[serde(with = "hex_amount")]
    pub responder_deposit: U256,
    /// Token of the counterparty's deposit.
    pub responder_deposit_token_address: Address,
    /// Default timeout in blocks.
    pub timeout: u64,
    /// Initial state.
    pub initial_state: Value,
    /// Outcome type tag.
    pub outcome_type: OutcomeType,
    /// Opaque metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ProposeParams {
    /// The proposal these params describe, at sequence number `app_seq_no`.
    ///
    /// The identity hash is left zero for the caller to compute.
    pub fn to_proposal(&self, app_seq_no: u32) -> AppInstanceProposal {
        AppInstanceProposal {
            identity_hash: Bytes32::ZERO,
            app_definition: self.app_definition,
            abi_encodings: self.abi_encodings.clone(),
            initiator_deposit: self.initiator_deposit,
            initiator_deposit_token_address: self.initiator_deposit_token_address,
            responder_deposit: self.responder_deposit,
            responder_deposit_token_address: self.responder_deposit_token_address,
            timeout: self.timeout,
            initial_state: self.initial_state.clone(),
            app_seq_no,
            proposed_by_identifier: self.initiator_xpub.clone(),
            proposed_to_identifier: self.responder_xpub.clone(),
            outcome_type: self.outcome_type,
            meta: self.meta.clone(),
        }
    }
}

/// `install`: accept a proposal and move deposits into the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallParams {
    /// Initiator's xpub (the accepting party).
    pub initiator_xpub: String,
    /// Responder's xpub.
    pub responder_xpub: String,
    /// Channel multisig.
    pub multisig_address: Address,
    /// Identity hash of the accepted proposal.
    pub app_identity_hash: Bytes32,
    /// Amount the install initiator's free balance is debited.
    #[serde(with = "hex_amount")]
    pub initiator_balance_decrement: U256,
    /// Amount the install responder's free balance is debited.
    #[serde(with = "hex_amount")]
    pub responder_balance_decrement: U256,
    /// Token of the initiator's debit.
    pub initiator_deposit_token_address: Address,
    /// Token of the responder's debit.
    pub responder_deposit_token_address: Address,
    /// App participants at `app_seq_no`, sorted ascending.
    pub participants: Vec<Address>,
    /// Initial state.
    pub initial_state: Value,
    /// App interface.
    pub app_interface: AppInterface,
    /// Default timeout in blocks.
    pub default_timeout: u64,
    /// Sequence number from the proposal.
    pub app_seq_no: u32,
    /// Outcome type tag.
    pub outcome_type: OutcomeType,
    /// Pay out without a limit (single-asset apps only).
    #[serde(default)]
    pub disable_limit: bool,
}

impl InstallParams {
    /// Params for installing `proposal`, run by `initiator_xpub`.
    ///
    /// The decrements follow the install roles: if the proposal's
    /// counterparty initiates the install, the deposits swap sides.
    pub fn from_proposal(
        proposal: &AppInstanceProposal,
        multisig_address: Address,
        initiator_xpub: &str,
        responder_xpub: &str,
        disable_limit: bool,
    ) -> Result<Self, ModelError> {
        let proposer_initiates = proposal.proposed_by_identifier == initiator_xpub;
        let proposer = (proposal.initiator_deposit, proposal.initiator_deposit_token_address);
        let counterparty = (proposal.responder_deposit, proposal.responder_deposit_token_address);
        let (init, resp) = if proposer_initiates {
            (proposer, counterparty)
        } else {
            (counterparty, proposer)
        };
        Ok(Self {
            initiator_xpub: initiator_xpub.to_string(),
            responder_xpub: responder_xpub.to_string(),
            multisig_address,
            app_identity_hash: proposal.identity_hash,
            initiator_balance_decrement: init.0,
            responder_balance_decrement: resp.0,
            initiator_deposit_token_address: init.1,
            responder_deposit_token_address: resp.1,
            participants: proposal.participants()?,
            initial_state: proposal.initial_state.clone(),
            app_interface: AppInterface {
                addr: proposal.app_definition,
                state_encoding: proposal.abi_encodings.state_encoding.clone(),
                action_encoding: proposal.abi_encodings.action_encoding.clone(),
            },
            default_timeout: proposal.timeout,
            app_seq_no: proposal.app_seq_no,
            outcome_type: proposal.outcome_type,
            disable_limit,
        })
    }
}

/// `update`: set an installed app's state directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    /// Initiator's xpub.
    pub initiator_xpub: String,
    /// Responder's xpub.
    pub responder_xpub: String,
    /// Channel multisig.
    pub multisig_address: Address,
    /// Target app.
    pub app_identity_hash: Bytes32,
    /// Replacement state.
    pub new_state: Value,
}

/// `takeAction`: apply an action to an installed app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeActionParams {
    /// Initiator's xpub.
    pub initiator_xpub: String,
    /// Responder's xpub.
    pub responder_xpub: String,
    /// Channel multisig.
    pub multisig_address: Address,
    /// Target app.
    pub app_identity_hash: Bytes32,
    /// Action, encodable with the app's action encoding.
    pub action: Value,
}

/// `uninstall`: pay out an app and remove it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallParams {
    /// Initiator's xpub.
    pub initiator_xpub: String,
    /// Responder's xpub.
    pub responder_xpub: String,
    /// Channel multisig.
    pub multisig_address: Address,
    /// App to remove.
    pub app_identity_hash: Bytes32,
    /// Past this block a refund app may pay out zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number_to_use_if_necessary: Option<u64>,
}

/// Parameters of any protocol, tagged by [`Protocol`](super::message::Protocol).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolParams {
    /// `setup`
    Setup(SetupParams),
    /// `propose`
    Propose(ProposeParams),
    /// `install`
    Install(InstallParams),
    /// `update`
    Update(UpdateParams),
    /// `takeAction`
    TakeAction(TakeActionParams),
    /// `uninstall`
    Uninstall(UninstallParams),
}

impl ProtocolParams {
    /// Channel the protocol runs on.
    pub fn multisig_address(&self) -> Address {
        match self {
            ProtocolParams::Setup(p) => p.multisig_address,
            ProtocolParams::Propose(p) => p.multisig_address,
            ProtocolParams::Install(p) => p.multisig_address,
            ProtocolParams::Update(p) => p.multisig_address,
            ProtocolParams::TakeAction(p) => p.multisig_address,
            ProtocolParams::Uninstall(p) => p.multisig_address,
        }
    }

    /// Initiator and responder xpubs.
    pub fn xpubs(&self) -> (&str, &str) {
        let (i, r) = match self {
            ProtocolParams::Setup(p) => (&p.initiator_xpub, &p.responder_xpub),
            ProtocolParams::Propose(p) => (&p.initiator_xpub, &p.responder_xpub),
            ProtocolParams::Install(p) => (&p.initiator_xpub, &p.responder_xpub),
            ProtocolParams::Update(p) => (&p.initiator_xpub, &p.responder_xpub),
            ProtocolParams::TakeAction(p) => (&p.initiator_xpub, &p.responder_xpub),
            ProtocolParams::Uninstall(p) => (&p.initiator_xpub, &p.responder_xpub),
        };
        (i.as_str(), r.as_str())
    }

    /// App the protocol targets, for per-app protocols.
    pub fn app_identity_hash(&self) -> Option<Bytes32> {
        match self {
            ProtocolParams::Setup(_) | ProtocolParams::Propose(_) => None,
            ProtocolParams::Install(p) => Some(p.app_identity_hash),
            ProtocolParams::Update(p) => Some(p.app_identity_hash),
            ProtocolParams::TakeAction(p) => Some(p.app_identity_hash),
            ProtocolParams::Uninstall(p) => Some(p.app_identity_hash),
        }
    }
}
