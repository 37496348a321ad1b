//! # Setup
//!
//! Creates the channel and signs the setup commitment at index 0.
//! Persists the channel, then the commitment keyed by the multisig.

use super::{FlowContext, ToSign};
use crate::domain::errors::ProtocolError;
use crate::domain::signing::{FREE_BALANCE_KEY_INDEX, SIGNATURE};
use sc_01_channel_model::StateChannel;
use sc_02_commitments::SetupCommitment;
use sc_04_instruction_executor::{CommitmentSubject, ProtocolMessage, ProtocolParams, SetupParams};
use tracing::info;

fn compute(ctx: &FlowContext, params: &SetupParams) -> Result<(StateChannel, SetupCommitment), ProtocolError> {
    let channel = StateChannel::setup_channel(
        ctx.network.identity_app,
        ctx.network.critical_addresses(),
        params.multisig_address,
        &[params.initiator_xpub.clone(), params.responder_xpub.clone()],
    )?;
    let setup = SetupCommitment::new(&ctx.network, &channel)?;
    Ok((channel, setup))
}

async fn ensure_new(ctx: &FlowContext, params: &SetupParams) -> Result<(), ProtocolError> {
    if ctx.store.get_state_channel(&params.multisig_address).await?.is_some() {
        return Err(ProtocolError::ChannelAlreadyExists(params.multisig_address));
    }
    Ok(())
}

async fn persist(
    ctx: &FlowContext,
    channel: &StateChannel,
    setup: SetupCommitment,
) -> Result<(), ProtocolError> {
    ctx.executor
        .persist_state_channel(vec![channel.clone()])
        .await?;
    ctx.executor
        .persist_commitment(setup, CommitmentSubject::Multisig(channel.multisig_address()))
        .await?;
    Ok(())
}

/// Initiator role.
pub async fn initiate(ctx: &FlowContext, params: SetupParams) -> Result<StateChannel, ProtocolError> {
    ensure_new(ctx, &params).await?;
    let (channel, mut setup) = compute(ctx, &params)?;
    ctx.initiate_exchange(
        ProtocolParams::Setup(params),
        &mut [ToSign::new(SIGNATURE, FREE_BALANCE_KEY_INDEX, &mut setup)],
    )
    .await?;
    persist(ctx, &channel, setup).await?;
    info!(multisig = %channel.multisig_address(), "[sc-05] channel set up");
    Ok(channel)
}

/// Responder role.
pub async fn respond(
    ctx: &FlowContext,
    message: &ProtocolMessage,
    params: SetupParams,
) -> Result<StateChannel, ProtocolError> {
    ensure_new(ctx, &params).await?;
    let (channel, mut setup) = compute(ctx, &params)?;
    let reply = ctx
        .countersign(
            message,
            &mut [ToSign::new(SIGNATURE, FREE_BALANCE_KEY_INDEX, &mut setup)],
        )
        .await?;
    persist(ctx, &channel, setup).await?;
    ctx.executor.send(reply).await?;
    info!(multisig = %channel.multisig_address(), "[sc-05] channel set up");
    Ok(channel)
}
