//! # Uninstall
//!
//! Pays an app's outcome into the free balance and removes the app. The
//! payouts come from the outcome interpreter; both parties sign the new
//! free balance at index 0.

use super::update::installed_app;
use super::{FlowContext, ToSign};
use crate::domain::errors::ProtocolError;
use crate::domain::signing::{FREE_BALANCE_KEY_INDEX, SIGNATURE};
use sc_01_channel_model::{AppInstance, StateChannel};
use sc_02_commitments::SetStateCommitment;
use sc_04_instruction_executor::{
    AppRecord, CommitmentSubject, PersistAppType, ProtocolMessage, ProtocolParams, UninstallParams,
};
use shared_types::credits;
use tracing::info;

struct UninstallRun {
    channel: StateChannel,
    app: AppInstance,
    free_balance: SetStateCommitment,
}

async fn compute(
    ctx: &FlowContext,
    pre: &StateChannel,
    params: &UninstallParams,
) -> Result<UninstallRun, ProtocolError> {
    let app = installed_app(pre, &params.app_identity_hash)?.clone();
    let payouts = ctx
        .outcome
        .compute_payouts(&app, params.block_number_to_use_if_necessary)
        .await?;
    let channel = pre.uninstall_app(&params.app_identity_hash, &credits(&payouts))?;
    let free_balance = SetStateCommitment::for_app(&ctx.network, channel.free_balance_app_instance())?;
    Ok(UninstallRun {
        channel,
        app,
        free_balance,
    })
}

async fn persist(ctx: &FlowContext, run: UninstallRun) -> Result<StateChannel, ProtocolError> {
    let hash = run.app.identity_hash();
    let fb_hash = run.channel.free_balance_app_instance().identity_hash();
    ctx.executor
        .persist_commitment(run.free_balance, CommitmentSubject::App(fb_hash))
        .await?;
    ctx.executor
        .persist_app_instance(
            PersistAppType::Uninstall,
            run.channel.clone(),
            AppRecord::Instance(run.app),
        )
        .await?;
    info!(multisig = %run.channel.multisig_address(), app = %hash, "[sc-05] app uninstalled");
    Ok(run.channel)
}

/// Initiator role.
pub async fn initiate(ctx: &FlowContext, params: UninstallParams) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    let mut run = compute(ctx, &pre, &params).await?;
    let params = ProtocolParams::Uninstall(params);
    ctx.ensure_members(&pre, &params)?;
    ctx.initiate_exchange(
        params,
        &mut [ToSign::new(SIGNATURE, FREE_BALANCE_KEY_INDEX, &mut run.free_balance)],
    )
    .await?;
    persist(ctx, run).await
}

/// Responder role.
pub async fn respond(
    ctx: &FlowContext,
    message: &ProtocolMessage,
    params: UninstallParams,
) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    ctx.ensure_members(&pre, &message.params)?;
    let mut run = compute(ctx, &pre, &params).await?;
    let reply = ctx
        .countersign(
            message,
            &mut [ToSign::new(SIGNATURE, FREE_BALANCE_KEY_INDEX, &mut run.free_balance)],
        )
        .await?;
    let channel = persist(ctx, run).await?;
    ctx.executor.send(reply).await?;
    Ok(channel)
}
