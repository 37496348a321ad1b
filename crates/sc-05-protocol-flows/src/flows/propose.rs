//! # Propose
//!
//! Adds a proposal at the channel's next sequence number. Both parties
//! sign the app's initial state (version 0) with the app's key.

use super::{FlowContext, ToSign};
use crate::domain::errors::ProtocolError;
use crate::domain::signing::SIGNATURE;
use sc_01_channel_model::{AppInstanceProposal, StateChannel};
use sc_02_commitments::SetStateCommitment;
use sc_04_instruction_executor::{
    AppRecord, CommitmentSubject, PersistAppType, ProposeParams, ProtocolMessage, ProtocolParams,
};
use tracing::info;

struct ProposeRun {
    channel: StateChannel,
    proposal: AppInstanceProposal,
    initial_state: SetStateCommitment,
}

fn compute(
    ctx: &FlowContext,
    pre: &StateChannel,
    params: &ProposeParams,
) -> Result<ProposeRun, ProtocolError> {
    let proposal = params
        .to_proposal(pre.num_proposed_apps())
        .with_computed_identity_hash()?;
    // also rejects deposits the outcome type cannot pay out
    let app = proposal.to_app_instance(params.multisig_address, false)?;
    let initial_state = SetStateCommitment::for_app(&ctx.network, &app)?;
    let channel = pre.add_proposal(proposal.clone())?;
    Ok(ProposeRun {
        channel,
        proposal,
        initial_state,
    })
}

async fn persist(ctx: &FlowContext, run: ProposeRun) -> Result<StateChannel, ProtocolError> {
    let hash = run.proposal.identity_hash;
    ctx.executor
        .persist_commitment(run.initial_state, CommitmentSubject::App(hash))
        .await?;
    ctx.executor
        .persist_app_instance(
            PersistAppType::Proposal,
            run.channel.clone(),
            AppRecord::Proposal(run.proposal),
        )
        .await?;
    info!(multisig = %run.channel.multisig_address(), app = %hash, "[sc-05] app proposed");
    Ok(run.channel)
}

/// Initiator role.
pub async fn initiate(ctx: &FlowContext, params: ProposeParams) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    let mut run = compute(ctx, &pre, &params)?;
    let params = ProtocolParams::Propose(params);
    ctx.ensure_members(&pre, &params)?;
    let seq = run.proposal.app_seq_no;
    ctx.initiate_exchange(
        params,
        &mut [ToSign::new(SIGNATURE, seq, &mut run.initial_state)],
    )
    .await?;
    persist(ctx, run).await
}

/// Responder role.
pub async fn respond(
    ctx: &FlowContext,
    message: &ProtocolMessage,
    params: ProposeParams,
) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    ctx.ensure_members(&pre, &message.params)?;
    let mut run = compute(ctx, &pre, &params)?;
    let seq = run.proposal.app_seq_no;
    let reply = ctx
        .countersign(message, &mut [ToSign::new(SIGNATURE, seq, &mut run.initial_state)])
        .await?;
    let channel = persist(ctx, run).await?;
    ctx.executor.send(reply).await?;
    Ok(channel)
}
