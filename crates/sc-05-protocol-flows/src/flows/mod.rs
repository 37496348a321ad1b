//! # Flows
//!
//! One module per protocol, each with an `initiate` and a `respond` role.
//! Both roles recompute the same post-protocol channel from the
//! pre-protocol channel and the params; only signatures cross the wire.
//!
//! Initiator: sign, send (seq 1), wait, verify, persist.
//! Responder: verify, sign, persist, reply (seq -1).

pub mod install;
pub mod propose;
pub mod setup;
pub mod take_action;
pub mod uninstall;
pub mod update;

use crate::domain::errors::ProtocolError;
use crate::domain::signing::SignatureRequest;
use crate::ports::outbound::StateChannelReader;
use sc_01_channel_model::{NetworkContext, StateChannel};
use sc_02_commitments::Commitment;
use sc_03_outcome_interpreter::{ChainReader, OutcomeInterpreterApi};
use sc_04_instruction_executor::{InstructionExecutor, ProtocolMessage, ProtocolParams};
use serde_json::Map;
use shared_crypto::Signature;
use shared_types::Address;
use std::sync::Arc;
use tracing::debug;

/// Everything a flow needs from the node.
#[derive(Clone)]
pub struct FlowContext {
    /// Runs the instructions flows yield.
    pub executor: InstructionExecutor,
    /// Persisted channels.
    pub store: Arc<dyn StateChannelReader>,
    /// Computes app state transitions.
    pub chain: Arc<dyn ChainReader>,
    /// Computes uninstall payouts.
    pub outcome: Arc<dyn OutcomeInterpreterApi>,
    /// Contract addresses.
    pub network: NetworkContext,
    /// This node's xpub.
    pub public_identifier: String,
}

/// A commitment both parties sign, with the key it is signed at.
pub(crate) struct ToSign<'a> {
    pub key: &'static str,
    pub key_index: u32,
    pub commitment: &'a mut dyn Commitment,
}

impl<'a> ToSign<'a> {
    pub(crate) fn new(key: &'static str, key_index: u32, commitment: &'a mut dyn Commitment) -> Self {
        Self {
            key,
            key_index,
            commitment,
        }
    }

    fn request(&self) -> SignatureRequest {
        SignatureRequest::new(self.key, self.commitment.hash_to_sign(), self.key_index)
    }

    fn attach(&mut self, mine: Signature, theirs: Signature) -> Result<(), ProtocolError> {
        self.commitment.set_signatures(vec![mine, theirs])?;
        Ok(())
    }
}

impl FlowContext {
    /// The persisted channel for `multisig`.
    pub(crate) async fn load_channel(&self, multisig: &Address) -> Result<StateChannel, ProtocolError> {
        self.store
            .get_state_channel(multisig)
            .await?
            .ok_or(ProtocolError::ChannelNotFound(*multisig))
    }

    /// Fails unless both xpubs in `params` own `channel`.
    pub(crate) fn ensure_members(
        &self,
        channel: &StateChannel,
        params: &ProtocolParams,
    ) -> Result<(), ProtocolError> {
        let (initiator, responder) = params.xpubs();
        for xpub in [initiator, responder] {
            if !channel.user_neutered_extended_keys().iter().any(|k| k == xpub) {
                return Err(ProtocolError::NotAChannelMember {
                    xpub: xpub.to_string(),
                    multisig: channel.multisig_address(),
                });
            }
        }
        Ok(())
    }

    /// Initiator half of the exchange: sign everything, send, wait for the
    /// reply and check the responder's signatures.
    pub(crate) async fn initiate_exchange(
        &self,
        params: ProtocolParams,
        to_sign: &mut [ToSign<'_>],
    ) -> Result<(), ProtocolError> {
        let responder = params.xpubs().1.to_string();
        let mut message = ProtocolMessage {
            process_id: ProtocolMessage::new_process_id(),
            params,
            to_xpub: responder.clone(),
            seq: 1,
            custom_data: Map::new(),
        };

        let mut mine = Vec::with_capacity(to_sign.len());
        for item in to_sign.iter() {
            let request = item.request();
            let signature = self.executor.sign(request.digest, request.key_index).await?;
            message = message.with_signature(request.key, &signature);
            mine.push(signature);
        }

        debug!(
            process_id = %message.process_id,
            protocol = %message.protocol(),
            "[sc-05] awaiting responder signatures"
        );
        let reply = self.executor.send_and_wait(message).await?;

        for (item, signature) in to_sign.iter_mut().zip(mine) {
            let theirs = item.request().counterparty_signature(&reply, &responder)?;
            item.attach(signature, theirs)?;
        }
        Ok(())
    }

    /// Responder half: check the initiator's signatures, then sign.
    ///
    /// Returns the reply; the caller sends it after persisting.
    pub(crate) async fn countersign(
        &self,
        message: &ProtocolMessage,
        to_sign: &mut [ToSign<'_>],
    ) -> Result<ProtocolMessage, ProtocolError> {
        let initiator = message.params.xpubs().0.to_string();

        let mut theirs = Vec::with_capacity(to_sign.len());
        for item in to_sign.iter() {
            theirs.push(item.request().counterparty_signature(message, &initiator)?);
        }

        let mut reply = message.reply(initiator);
        for (item, their_signature) in to_sign.iter_mut().zip(theirs) {
            let request = item.request();
            let signature = self.executor.sign(request.digest, request.key_index).await?;
            reply = reply.with_signature(request.key, &signature);
            item.attach(signature, their_signature)?;
        }
        Ok(reply)
    }
}
