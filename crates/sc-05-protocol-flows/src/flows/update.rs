//! # Update
//!
//! Replaces an installed app's state, bumping its version by one. Both
//! parties sign the app's new state with the app's key.

use super::{FlowContext, ToSign};
use crate::domain::errors::ProtocolError;
use crate::domain::signing::SIGNATURE;
use sc_01_channel_model::{AppInstance, ModelError, StateChannel};
use sc_02_commitments::SetStateCommitment;
use sc_04_instruction_executor::{
    AppRecord, CommitmentSubject, PersistAppType, ProtocolMessage, ProtocolParams, UpdateParams,
};
use serde_json::Value;
use shared_types::Bytes32;
use tracing::info;

/// Post-update channel, app and unsigned commitment. Shared with takeAction.
pub(crate) struct UpdateRun {
    channel: StateChannel,
    app: AppInstance,
    set_state: SetStateCommitment,
}

impl UpdateRun {
    pub(crate) fn to_sign(&mut self) -> [ToSign<'_>; 1] {
        [ToSign::new(SIGNATURE, self.app.app_seq_no, &mut self.set_state)]
    }
}

/// The installed app `hash` of `pre`. The free balance is not an app here.
pub(crate) fn installed_app<'a>(
    pre: &'a StateChannel,
    hash: &Bytes32,
) -> Result<&'a AppInstance, ProtocolError> {
    if *hash == pre.free_balance_app_instance().identity_hash() {
        return Err(ModelError::FreeBalanceNotAllowed(pre.multisig_address()).into());
    }
    Ok(pre.get_app_instance(hash)?)
}

pub(crate) fn compute(
    ctx: &FlowContext,
    pre: &StateChannel,
    hash: &Bytes32,
    new_state: Value,
) -> Result<UpdateRun, ProtocolError> {
    let timeout = installed_app(pre, hash)?.default_timeout;
    let channel = pre.set_state(hash, new_state, timeout)?;
    let app = channel.get_app_instance(hash)?.clone();
    let set_state = SetStateCommitment::for_app(&ctx.network, &app)?;
    Ok(UpdateRun {
        channel,
        app,
        set_state,
    })
}

pub(crate) async fn persist(ctx: &FlowContext, run: UpdateRun) -> Result<StateChannel, ProtocolError> {
    let hash = run.app.identity_hash();
    let version = run.app.latest_version_number;
    ctx.executor
        .persist_commitment(run.set_state, CommitmentSubject::App(hash))
        .await?;
    ctx.executor
        .persist_app_instance(
            PersistAppType::Instance,
            run.channel.clone(),
            AppRecord::Instance(run.app),
        )
        .await?;
    info!(multisig = %run.channel.multisig_address(), app = %hash, version, "[sc-05] app state updated");
    Ok(run.channel)
}

/// Initiator role.
pub async fn initiate(ctx: &FlowContext, params: UpdateParams) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    let mut run = compute(ctx, &pre, &params.app_identity_hash, params.new_state.clone())?;
    let params = ProtocolParams::Update(params);
    ctx.ensure_members(&pre, &params)?;
    ctx.initiate_exchange(params, &mut run.to_sign()).await?;
    persist(ctx, run).await
}

/// Responder role.
pub async fn respond(
    ctx: &FlowContext,
    message: &ProtocolMessage,
    params: UpdateParams,
) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    ctx.ensure_members(&pre, &message.params)?;
    let mut run = compute(ctx, &pre, &params.app_identity_hash, params.new_state)?;
    let reply = ctx.countersign(message, &mut run.to_sign()).await?;
    let channel = persist(ctx, run).await?;
    ctx.executor.send(reply).await?;
    Ok(channel)
}
