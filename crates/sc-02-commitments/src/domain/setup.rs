//! # Setup Commitment
//!
//! The first transaction of a channel: the multisig delegate-calls
//! `executeEffectOfFreeBalance`, binding the channel's funds to whatever
//! the free balance app finalizes to.

use super::entities::{CommitmentKind, MinimalTransaction, MultisigOperation};
use super::errors::CommitmentError;
use super::multisig::{encode_multisig_transaction, exec_transaction};
use crate::ports::{require_two, Commitment};
use primitive_types::U256;
use sc_01_channel_model::{NetworkContext, StateChannel};
use serde::{Deserialize, Serialize};
use shared_crypto::abi::{encode_call, Token};
use shared_crypto::Signature;
use shared_types::{Address, Bytes32};

const EXECUTE_EFFECT_OF_FREE_BALANCE: &str = "executeEffectOfFreeBalance(address,bytes32,address)";

/// Commitment that installs the free balance's effect on the multisig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupCommitment {
    /// Channel multisig.
    pub multisig_address: Address,
    /// Index-0 owner addresses, sorted ascending.
    pub multisig_owners: Vec<Address>,
    /// Challenge registry the delegate reads the free balance outcome from.
    pub challenge_registry: Address,
    /// Delegate target contract.
    pub conditional_transaction_delegate_target: Address,
    /// Identity hash of the free balance app.
    pub free_balance_app_identity_hash: Bytes32,
    /// Interpreter for the free balance outcome.
    pub multi_asset_interpreter: Address,
    #[serde(default)]
    signatures: Vec<Signature>,
}

impl SetupCommitment {
    /// Unsigned setup commitment for `channel`.
    pub fn new(network: &NetworkContext, channel: &StateChannel) -> Result<Self, CommitmentError> {
        Ok(Self {
            multisig_address: channel.multisig_address(),
            multisig_owners: channel.multisig_owners()?,
            challenge_registry: network.challenge_registry,
            conditional_transaction_delegate_target: network
                .conditional_transaction_delegate_target,
            free_balance_app_identity_hash: channel.free_balance_app_instance().identity_hash(),
            multi_asset_interpreter: network.multi_asset_multi_party_coin_transfer_interpreter,
            signatures: Vec::new(),
        })
    }

    /// The delegate call the multisig executes.
    pub fn transaction_details(&self) -> MinimalTransaction {
        MinimalTransaction {
            to: self.conditional_transaction_delegate_target,
            value: U256::zero(),
            data: encode_call(
                EXECUTE_EFFECT_OF_FREE_BALANCE,
                &[
                    Token::Address(self.challenge_registry),
                    Token::FixedBytes(self.free_balance_app_identity_hash.as_bytes().to_vec()),
                    Token::Address(self.multi_asset_interpreter),
                ],
            ),
        }
    }
}

impl Commitment for SetupCommitment {
    fn kind(&self) -> CommitmentKind {
        CommitmentKind::Setup
    }

    fn encode(&self) -> Vec<u8> {
        encode_multisig_transaction(
            &self.multisig_owners,
            &self.transaction_details(),
            MultisigOperation::DelegateCall,
        )
    }

    fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    fn set_signatures(&mut self, signatures: Vec<Signature>) -> Result<(), CommitmentError> {
        require_two(self.kind(), &signatures)?;
        self.signatures = signatures;
        Ok(())
    }

    fn get_signed_transaction(&self) -> Result<MinimalTransaction, CommitmentError> {
        require_two(self.kind(), &self.signatures)?;
        exec_transaction(
            self.multisig_address,
            &self.transaction_details(),
            MultisigOperation::DelegateCall,
            &self.hash_to_sign(),
            &self.signatures,
        )
    }
}
