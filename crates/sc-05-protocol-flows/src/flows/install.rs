//! # Install
//!
//! Turns a held proposal into an installed app, debiting both deposits
//! from the free balance. Two commitments are signed per side: the
//! conditional transaction for the app (app key) and the free balance
//! update (index 0).

use super::{FlowContext, ToSign};
use crate::domain::errors::ProtocolError;
use crate::domain::signing::{FREE_BALANCE_KEY_INDEX, SIGNATURE, SIGNATURE2};
use sc_01_channel_model::{AppInstance, StateChannel};
use sc_02_commitments::{ConditionalTransactionCommitment, SetStateCommitment};
use sc_04_instruction_executor::{
    AppRecord, CommitmentSubject, InstallParams, PersistAppType, ProtocolMessage, ProtocolParams,
};
use tracing::info;

struct InstallRun {
    channel: StateChannel,
    app: AppInstance,
    conditional: ConditionalTransactionCommitment,
    free_balance: SetStateCommitment,
}

fn compute(
    ctx: &FlowContext,
    pre: &StateChannel,
    params: &InstallParams,
) -> Result<InstallRun, ProtocolError> {
    let proposal = pre.get_proposal(&params.app_identity_hash)?;
    let expected = InstallParams::from_proposal(
        proposal,
        params.multisig_address,
        &params.initiator_xpub,
        &params.responder_xpub,
        params.disable_limit,
    )?;
    if expected != *params {
        return Err(ProtocolError::InstallParamsMismatch {
            app: params.app_identity_hash,
        });
    }

    let app = proposal.to_app_instance(params.multisig_address, params.disable_limit)?;
    let channel = pre.install_app(app.clone(), &proposal.deposit_debits()?)?;
    let conditional = ConditionalTransactionCommitment::new(&ctx.network, &channel, &app)?;
    let free_balance = SetStateCommitment::for_app(&ctx.network, channel.free_balance_app_instance())?;
    Ok(InstallRun {
        channel,
        app,
        conditional,
        free_balance,
    })
}

fn to_sign(run: &mut InstallRun) -> [ToSign<'_>; 2] {
    let seq = run.app.app_seq_no;
    [
        ToSign::new(SIGNATURE, seq, &mut run.conditional),
        ToSign::new(SIGNATURE2, FREE_BALANCE_KEY_INDEX, &mut run.free_balance),
    ]
}

async fn persist(ctx: &FlowContext, run: InstallRun) -> Result<StateChannel, ProtocolError> {
    let hash = run.app.identity_hash();
    let fb_hash = run.channel.free_balance_app_instance().identity_hash();
    ctx.executor
        .persist_commitment(run.conditional, CommitmentSubject::App(hash))
        .await?;
    ctx.executor
        .persist_commitment(run.free_balance, CommitmentSubject::App(fb_hash))
        .await?;
    ctx.executor
        .persist_app_instance(
            PersistAppType::Instance,
            run.channel.clone(),
            AppRecord::Instance(run.app),
        )
        .await?;
    info!(multisig = %run.channel.multisig_address(), app = %hash, "[sc-05] app installed");
    Ok(run.channel)
}

/// Initiator role.
pub async fn initiate(ctx: &FlowContext, params: InstallParams) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    let mut run = compute(ctx, &pre, &params)?;
    let params = ProtocolParams::Install(params);
    ctx.ensure_members(&pre, &params)?;
    ctx.initiate_exchange(params, &mut to_sign(&mut run)).await?;
    persist(ctx, run).await
}

/// Responder role.
pub async fn respond(
    ctx: &FlowContext,
    message: &ProtocolMessage,
    params: InstallParams,
) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    ctx.ensure_members(&pre, &message.params)?;
    let mut run = compute(ctx, &pre, &params)?;
    let reply = ctx.countersign(message, &mut to_sign(&mut run)).await?;
    let channel = persist(ctx, run).await?;
    ctx.executor.send(reply).await?;
    Ok(channel)
}
