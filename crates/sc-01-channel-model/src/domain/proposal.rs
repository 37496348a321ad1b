//! # App Instance Proposal
//!
//! A pending app awaiting the counterparty's acceptance. The proposal holds
//! the deposits each side commits; installing it turns those into free
//! balance debits and interpreter parameters.

use super::app_instance::AppInstance;
use super::errors::ModelError;
use super::invariants::invariant_state_encodable;
use super::value_objects::{
    AppAbiEncodings, AppIdentity, AppInterface, InterpreterParams,
    MultiAssetMultiPartyCoinTransferInterpreterParams, OutcomeType,
    SingleAssetTwoPartyCoinTransferInterpreterParams, TwoPartyFixedOutcomeInterpreterParams,
};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_crypto::{xkey_kth_address, xkeys_to_sorted_kth_addresses};
use shared_types::{hex_amount, Address, BalanceDelta, Bytes32, TokenIndexedIncrements};

/// A proposed app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInstanceProposal {
    /// Identity hash the app will have once installed.
    pub identity_hash: Bytes32,
    /// App definition contract.
    pub app_definition: Address,
    /// State and action encodings.
    pub abi_encodings: AppAbiEncodings,
    /// Amount the proposer deposits.
    #[serde(with = "hex_amount")]
    pub initiator_deposit: U256,
    /// Token of the proposer's deposit.
    pub initiator_deposit_token_address: Address,
    /// Amount the counterparty deposits.
    #[serde(with = "hex_amount")]
    pub responder_deposit: U256,
    /// Token of the counterparty's deposit.
    pub responder_deposit_token_address: Address,
    /// Default timeout in blocks.
    pub timeout: u64,
    /// State the app starts in.
    pub initial_state: Value,
    /// Sequence number assigned at proposal time.
    pub app_seq_no: u32,
    /// Proposer's extended public key.
    pub proposed_by_identifier: String,
    /// Counterparty's extended public key.
    pub proposed_to_identifier: String,
    /// Outcome type tag.
    pub outcome_type: OutcomeType,
    /// Opaque application metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl AppInstanceProposal {
    /// Participants: both parties' keys at `app_seq_no`, sorted ascending.
    pub fn participants(&self) -> Result<Vec<Address>, ModelError> {
        Ok(xkeys_to_sorted_kth_addresses(
            &[&self.proposed_by_identifier, &self.proposed_to_identifier],
            self.app_seq_no,
        )?)
    }

    /// The identity the installed app will carry.
    pub fn identity(&self) -> Result<AppIdentity, ModelError> {
        Ok(AppIdentity {
            channel_nonce: u64::from(self.app_seq_no),
            participants: self.participants()?,
            app_definition: self.app_definition,
            default_timeout: self.timeout,
        })
    }

    /// A copy whose `identity_hash` is recomputed from its fields.
    ///
    /// Rejects empty or unencodable initial states.
    pub fn with_computed_identity_hash(mut self) -> Result<Self, ModelError> {
        if self.initial_state.is_null()
            || self.initial_state.as_object().is_some_and(|o| o.is_empty())
        {
            return Err(ModelError::EmptyInitialState);
        }
        invariant_state_encodable(&self.abi_encodings.state_encoding, &self.initial_state)?;
        self.identity_hash = self.identity()?.identity_hash();
        Ok(self)
    }

    /// Free balance debits for both deposits.
    ///
    /// Keyed by each party's index-0 address, which is where the free
    /// balance records their funds.
    pub fn deposit_debits(&self) -> Result<TokenIndexedIncrements, ModelError> {
        let initiator = xkey_kth_address(&self.proposed_by_identifier, 0)?;
        let responder = xkey_kth_address(&self.proposed_to_identifier, 0)?;
        let mut increments = TokenIndexedIncrements::new();
        for (token, who, amount) in [
            (self.initiator_deposit_token_address, initiator, self.initiator_deposit),
            (self.responder_deposit_token_address, responder, self.responder_deposit),
        ] {
            let entry = increments.entry(token).or_default();
            let total = match entry.get(&who) {
                Some(BalanceDelta::Debit(prior)) => prior.saturating_add(amount),
                _ => amount,
            };
            entry.insert(who, BalanceDelta::Debit(total));
        }
        Ok(increments)
    }

    /// The app this proposal installs as.
    pub fn to_app_instance(
        &self,
        multisig_address: Address,
        disable_limit: bool,
    ) -> Result<AppInstance, ModelError> {
        Ok(AppInstance {
            multisig_address,
            participants: self.participants()?,
            default_timeout: self.timeout,
            app_interface: AppInterface {
                addr: self.app_definition,
                state_encoding: self.abi_encodings.state_encoding.clone(),
                action_encoding: self.abi_encodings.action_encoding.clone(),
            },
            app_seq_no: self.app_seq_no,
            latest_state: self.initial_state.clone(),
            latest_version_number: 0,
            latest_timeout: self.timeout,
            interpreter_params: compute_interpreter_params(self, disable_limit)?,
            meta: self.meta.clone(),
        })
    }
}

/// Interpreter parameters for `proposal`, derived from its deposits.
///
/// The proposer is the initiator: for two-party fixed outcomes player one
/// is the proposer's index-0 address.
pub fn compute_interpreter_params(
    proposal: &AppInstanceProposal,
    disable_limit: bool,
) -> Result<InterpreterParams, ModelError> {
    let first = proposal.initiator_deposit_token_address;
    let second = proposal.responder_deposit_token_address;
    let single_asset = |outcome_type: OutcomeType| {
        if first != second {
            return Err(ModelError::MixedDepositAssets {
                outcome_type: outcome_type.to_string(),
                first,
                second,
            });
        }
        Ok(first)
    };
    let sum = proposal
        .initiator_deposit
        .saturating_add(proposal.responder_deposit);

    let params = match proposal.outcome_type {
        OutcomeType::TwoPartyFixedOutcome => {
            let token_address = single_asset(proposal.outcome_type)?;
            InterpreterParams::TwoPartyFixed(TwoPartyFixedOutcomeInterpreterParams {
                player_addrs: [
                    xkey_kth_address(&proposal.proposed_by_identifier, 0)?,
                    xkey_kth_address(&proposal.proposed_to_identifier, 0)?,
                ],
                amount: sum,
                token_address,
            })
        }
        OutcomeType::SingleAssetTwoPartyCoinTransfer => {
            let token_address = single_asset(proposal.outcome_type)?;
            InterpreterParams::SingleAssetTwoParty(
                SingleAssetTwoPartyCoinTransferInterpreterParams {
                    limit: if disable_limit { U256::MAX } else { sum },
                    token_address,
                },
            )
        }
        OutcomeType::MultiAssetMultiPartyCoinTransfer => {
            let (limit, token_addresses) = if first == second {
                (vec![sum], vec![first])
            } else {
                (
                    vec![proposal.initiator_deposit, proposal.responder_deposit],
                    vec![first, second],
                )
            };
            InterpreterParams::MultiAssetMultiParty(
                MultiAssetMultiPartyCoinTransferInterpreterParams {
                    limit,
                    token_addresses,
                },
            )
        }
    };
    Ok(params)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use shared_crypto::ExtendedPrivateKey;

    pub(crate) fn xpub(seed: u8) -> String {
        ExtendedPrivateKey::from_seed(&[seed; 32])
            .unwrap()
            .neuter()
            .to_string()
    }

    pub(crate) fn proposal(outcome_type: OutcomeType, token_b: Address) -> AppInstanceProposal {
        AppInstanceProposal {
            identity_hash: Bytes32::ZERO,
            app_definition: Address([0xAD; 20]),
            abi_encodings: AppAbiEncodings {
                state_encoding: "tuple(uint256 counter)".into(),
                action_encoding: None,
            },
            initiator_deposit: U256::from(5),
            initiator_deposit_token_address: Address::ZERO,
            responder_deposit: U256::from(7),
            responder_deposit_token_address: token_b,
            timeout: 100,
            initial_state: json!({ "counter": 0 }),
            app_seq_no: 1,
            proposed_by_identifier: xpub(1),
            proposed_to_identifier: xpub(2),
            outcome_type,
            meta: None,
        }
        .with_computed_identity_hash()
        .unwrap()
    }

    #[test]
    fn test_identity_hash_matches_installed_app() {
        let p = proposal(OutcomeType::SingleAssetTwoPartyCoinTransfer, Address::ZERO);
        let app = p.to_app_instance(Address([0x4D; 20]), false).unwrap();
        assert_eq!(app.identity_hash(), p.identity_hash);
        assert_eq!(app.latest_version_number, 0);
        assert_eq!(app.participants, p.participants().unwrap());
    }

    #[test]
    fn test_two_party_fixed_rejects_mixed_tokens() {
        let p = proposal(OutcomeType::TwoPartyFixedOutcome, Address([0x70; 20]));
        let err = compute_interpreter_params(&p, false).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("For a TWO_PARTY_FIXED_OUTCOME there cannot be two kinds of tokens deposited"));
    }

    #[test]
    fn test_two_party_fixed_players_are_proposer_then_counterparty() {
        let p = proposal(OutcomeType::TwoPartyFixedOutcome, Address::ZERO);
        match compute_interpreter_params(&p, false).unwrap() {
            InterpreterParams::TwoPartyFixed(params) => {
                assert_eq!(params.amount, U256::from(12));
                assert_eq!(params.player_addrs[0], xkey_kth_address(&xpub(1), 0).unwrap());
                assert_eq!(params.player_addrs[1], xkey_kth_address(&xpub(2), 0).unwrap());
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn test_single_asset_disable_limit() {
        let p = proposal(OutcomeType::SingleAssetTwoPartyCoinTransfer, Address::ZERO);
        match compute_interpreter_params(&p, true).unwrap() {
            InterpreterParams::SingleAssetTwoParty(params) => assert_eq!(params.limit, U256::MAX),
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn test_multi_asset_per_token_limits() {
        let token = Address([0x70; 20]);
        let p = proposal(OutcomeType::MultiAssetMultiPartyCoinTransfer, token);
        match compute_interpreter_params(&p, false).unwrap() {
            InterpreterParams::MultiAssetMultiParty(params) => {
                assert_eq!(params.limit, vec![U256::from(5), U256::from(7)]);
                assert_eq!(params.token_addresses, vec![Address::ZERO, token]);
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn test_deposit_debits_same_token() {
        let p = proposal(OutcomeType::SingleAssetTwoPartyCoinTransfer, Address::ZERO);
        let debits = p.deposit_debits().unwrap();
        let eth = &debits[&Address::ZERO];
        assert_eq!(eth.len(), 2);
        assert!(eth.values().all(|d| matches!(d, BalanceDelta::Debit(_))));
    }

    #[test]
    fn test_empty_initial_state_rejected() {
        let mut p = proposal(OutcomeType::SingleAssetTwoPartyCoinTransfer, Address::ZERO);
        p.initial_state = json!({});
        let err = p.with_computed_identity_hash().unwrap_err();
        assert!(err.to_string().contains("cannot have an empty initial state"));
    }

    #[test]
    fn test_proposal_json_amounts_are_hex() {
        let p = proposal(OutcomeType::SingleAssetTwoPartyCoinTransfer, Address::ZERO);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["initiatorDeposit"]["_hex"], "0x5");
        let back: AppInstanceProposal = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
