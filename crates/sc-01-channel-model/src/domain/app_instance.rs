//! # App Instance
//!
//! One conditional application's point-in-time state. The identity hash is
//! a function of immutable fields only, so it is recomputed rather than
//! stored; the JSON form carries it and deserialization rejects a mismatch.

use super::errors::ModelError;
use super::invariants::invariant_state_encodable;
use super::value_objects::{
    AppIdentity, AppInterface, InterpreterParams, MultiAssetMultiPartyCoinTransferInterpreterParams,
    NetworkContext, OutcomeType, SingleAssetTwoPartyCoinTransferInterpreterParams,
    TwoPartyFixedOutcomeInterpreterParams,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_crypto::abi::encode_value;
use shared_crypto::keccak256;
use shared_types::{Address, Bytes32};

/// An installed (or about to be installed) app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AppInstanceJson", into = "AppInstanceJson")]
pub struct AppInstance {
    /// Multisig of the owning channel.
    pub multisig_address: Address,
    /// Signer addresses at `app_seq_no`, sorted ascending.
    pub participants: Vec<Address>,
    /// Default timeout in blocks.
    pub default_timeout: u64,
    /// Contract address and encodings.
    pub app_interface: AppInterface,
    /// Sequence number assigned at proposal time.
    pub app_seq_no: u32,
    /// Current state blob, encodable with `app_interface.state_encoding`.
    pub latest_state: Value,
    /// Bumped on every accepted state change.
    pub latest_version_number: u64,
    /// Timeout of the current state, in blocks.
    pub latest_timeout: u64,
    /// Interpreter parameters; the variant determines the outcome type.
    pub interpreter_params: InterpreterParams,
    /// Opaque application metadata.
    pub meta: Option<Value>,
}

impl AppInstance {
    /// The immutable identity fields.
    pub fn identity(&self) -> AppIdentity {
        AppIdentity {
            channel_nonce: u64::from(self.app_seq_no),
            participants: self.participants.clone(),
            app_definition: self.app_interface.addr,
            default_timeout: self.default_timeout,
        }
    }

    /// Identity hash of this app.
    pub fn identity_hash(&self) -> Bytes32 {
        self.identity().identity_hash()
    }

    /// Outcome type tag.
    pub fn outcome_type(&self) -> OutcomeType {
        self.interpreter_params.outcome_type()
    }

    /// Interpreter contract the conditional transaction delegates to.
    pub fn interpreter_address(&self, network: &NetworkContext) -> Address {
        self.interpreter_params.interpreter_address(network)
    }

    /// ABI encoding of the latest state.
    pub fn encode_state(&self) -> Result<Vec<u8>, ModelError> {
        Ok(encode_value(&self.app_interface.state_encoding, &self.latest_state)?)
    }

    /// keccak-256 of the encoded latest state.
    pub fn state_hash(&self) -> Result<Bytes32, ModelError> {
        Ok(keccak256(&self.encode_state()?))
    }

    /// ABI encoding of `action` with the app's action encoding.
    pub fn encode_action(&self, action: &Value) -> Result<Vec<u8>, ModelError> {
        let encoding = self
            .app_interface
            .action_encoding
            .as_deref()
            .ok_or_else(|| ModelError::NoActionEncoding(self.identity_hash()))?;
        Ok(encode_value(encoding, action)?)
    }

    /// A copy with `new_state`, `timeout` and the version bumped by one.
    ///
    /// Rejects states the state encoding cannot encode.
    pub fn set_state(&self, new_state: Value, timeout: u64) -> Result<Self, ModelError> {
        invariant_state_encodable(&self.app_interface.state_encoding, &new_state)?;
        let mut next = self.clone();
        next.latest_state = new_state;
        next.latest_timeout = timeout;
        next.latest_version_number += 1;
        Ok(next)
    }
}

/// Persisted and transmitted shape of an [`AppInstance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInstanceJson {
    identity_hash: Bytes32,
    multisig_address: Address,
    participants: Vec<Address>,
    default_timeout: u64,
    app_interface: AppInterface,
    app_seq_no: u32,
    latest_state: Value,
    latest_version_number: u64,
    latest_timeout: u64,
    outcome_type: OutcomeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    two_party_outcome_interpreter_params: Option<TwoPartyFixedOutcomeInterpreterParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    single_asset_two_party_coin_transfer_interpreter_params:
        Option<SingleAssetTwoPartyCoinTransferInterpreterParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multi_asset_multi_party_coin_transfer_interpreter_params:
        Option<MultiAssetMultiPartyCoinTransferInterpreterParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
}

impl From<AppInstance> for AppInstanceJson {
    fn from(app: AppInstance) -> Self {
        let identity_hash = app.identity_hash();
        let outcome_type = app.outcome_type();
        let (mut two_party, mut single, mut multi) = (None, None, None);
        match app.interpreter_params {
            InterpreterParams::TwoPartyFixed(p) => two_party = Some(p),
            InterpreterParams::SingleAssetTwoParty(p) => single = Some(p),
            InterpreterParams::MultiAssetMultiParty(p) => multi = Some(p),
        }
        Self {
            identity_hash,
            multisig_address: app.multisig_address,
            participants: app.participants,
            default_timeout: app.default_timeout,
            app_interface: app.app_interface,
            app_seq_no: app.app_seq_no,
            latest_state: app.latest_state,
            latest_version_number: app.latest_version_number,
            latest_timeout: app.latest_timeout,
            outcome_type,
            two_party_outcome_interpreter_params: two_party,
            single_asset_two_party_coin_transfer_interpreter_params: single,
            multi_asset_multi_party_coin_transfer_interpreter_params: multi,
            meta: app.meta,
        }
    }
}

impl TryFrom<AppInstanceJson> for AppInstance {
    type Error = ModelError;

    fn try_from(json: AppInstanceJson) -> Result<Self, Self::Error> {
        let mismatch = || ModelError::InterpreterParamsMismatch {
            app: json.identity_hash.to_hex(),
            outcome_type: json.outcome_type.to_string(),
        };
        let interpreter_params = match json.outcome_type {
            OutcomeType::TwoPartyFixedOutcome => json
                .two_party_outcome_interpreter_params
                .clone()
                .map(InterpreterParams::TwoPartyFixed),
            OutcomeType::SingleAssetTwoPartyCoinTransfer => json
                .single_asset_two_party_coin_transfer_interpreter_params
                .clone()
                .map(InterpreterParams::SingleAssetTwoParty),
            OutcomeType::MultiAssetMultiPartyCoinTransfer => json
                .multi_asset_multi_party_coin_transfer_interpreter_params
                .clone()
                .map(InterpreterParams::MultiAssetMultiParty),
        }
        .ok_or_else(mismatch)?;

        let app = AppInstance {
            multisig_address: json.multisig_address,
            participants: json.participants,
            default_timeout: json.default_timeout,
            app_interface: json.app_interface,
            app_seq_no: json.app_seq_no,
            latest_state: json.latest_state,
            latest_version_number: json.latest_version_number,
            latest_timeout: json.latest_timeout,
            interpreter_params,
            meta: json.meta,
        };

        let computed = app.identity_hash();
        if computed != json.identity_hash {
            return Err(ModelError::IdentityHashMismatch {
                stored: json.identity_hash,
                computed,
            });
        }
        Ok(app)
    }
}
