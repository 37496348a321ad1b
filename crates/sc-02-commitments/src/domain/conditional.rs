//! # Conditional Transaction Commitment
//!
//! Pays out an installed app: the multisig delegate-calls
//! `executeEffectOfInterpretedAppOutcome`, which reads the app's outcome
//! from the challenge registry and runs it through the interpreter.

use super::entities::{hex_bytes, CommitmentKind, MinimalTransaction, MultisigOperation};
use super::errors::CommitmentError;
use super::multisig::{encode_multisig_transaction, exec_transaction};
use crate::ports::{require_two, Commitment};
use primitive_types::U256;
use sc_01_channel_model::{AppInstance, NetworkContext, StateChannel};
use serde::{Deserialize, Serialize};
use shared_crypto::abi::{encode_call, Token};
use shared_crypto::Signature;
use shared_types::{Address, Bytes32};

const EXECUTE_EFFECT_OF_INTERPRETED_APP_OUTCOME: &str =
    "executeEffectOfInterpretedAppOutcome(address,bytes32,bytes32,address,bytes)";

/// Commitment to pay out `app_identity_hash` through its interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalTransactionCommitment {
    /// Channel multisig.
    pub multisig_address: Address,
    /// Index-0 owner addresses, sorted ascending.
    pub multisig_owners: Vec<Address>,
    /// Challenge registry holding the app's outcome.
    pub challenge_registry: Address,
    /// Delegate target contract.
    pub conditional_transaction_delegate_target: Address,
    /// Identity hash of the channel's free balance.
    pub free_balance_app_identity_hash: Bytes32,
    /// Identity hash of the paid-out app.
    pub app_identity_hash: Bytes32,
    /// Interpreter contract for the app's outcome type.
    pub interpreter_addr: Address,
    /// ABI-encoded interpreter parameters.
    #[serde(with = "hex_bytes")]
    pub interpreter_params: Vec<u8>,
    #[serde(default)]
    signatures: Vec<Signature>,
}

impl ConditionalTransactionCommitment {
    /// Unsigned conditional commitment for `app` in `channel`.
    pub fn new(
        network: &NetworkContext,
        channel: &StateChannel,
        app: &AppInstance,
    ) -> Result<Self, CommitmentError> {
        Ok(Self {
            multisig_address: channel.multisig_address(),
            multisig_owners: channel.multisig_owners()?,
            challenge_registry: network.challenge_registry,
            conditional_transaction_delegate_target: network
                .conditional_transaction_delegate_target,
            free_balance_app_identity_hash: channel.free_balance_app_instance().identity_hash(),
            app_identity_hash: app.identity_hash(),
            interpreter_addr: app.interpreter_address(network),
            interpreter_params: app.interpreter_params.encode(),
            signatures: Vec::new(),
        })
    }

    /// The delegate call the multisig executes.
    pub fn transaction_details(&self) -> MinimalTransaction {
        MinimalTransaction {
            to: self.conditional_transaction_delegate_target,
            value: U256::zero(),
            data: encode_call(
                EXECUTE_EFFECT_OF_INTERPRETED_APP_OUTCOME,
                &[
                    Token::Address(self.challenge_registry),
                    Token::FixedBytes(self.free_balance_app_identity_hash.as_bytes().to_vec()),
                    Token::FixedBytes(self.app_identity_hash.as_bytes().to_vec()),
                    Token::Address(self.interpreter_addr),
                    Token::Bytes(self.interpreter_params.clone()),
                ],
            ),
        }
    }
}

impl Commitment for ConditionalTransactionCommitment {
    fn kind(&self) -> CommitmentKind {
        CommitmentKind::Conditional
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
