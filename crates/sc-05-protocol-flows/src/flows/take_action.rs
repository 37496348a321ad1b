//! # Take Action
//!
//! Each party computes the app's next state from the action through its
//! own chain reader, then proceeds as an update.

use super::update::{self, installed_app};
use super::FlowContext;
use crate::domain::errors::ProtocolError;
use sc_01_channel_model::StateChannel;
use sc_04_instruction_executor::{ProtocolMessage, ProtocolParams, TakeActionParams};
use serde_json::Value;
use tracing::debug;

async fn next_state(
    ctx: &FlowContext,
    pre: &StateChannel,
    params: &TakeActionParams,
) -> Result<Value, ProtocolError> {
    let app = installed_app(pre, &params.app_identity_hash)?;
    app.encode_action(&params.action)?;
    let state = ctx.chain.compute_state_transition(app, &params.action).await?;
    debug!(app = %params.app_identity_hash, "[sc-05] computed action transition");
    Ok(state)
}

/// Initiator role.
pub async fn initiate(ctx: &FlowContext, params: TakeActionParams) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    let new_state = next_state(ctx, &pre, &params).await?;
    let mut run = update::compute(ctx, &pre, &params.app_identity_hash, new_state)?;
    let params = ProtocolParams::TakeAction(params);
    ctx.ensure_members(&pre, &params)?;
    ctx.initiate_exchange(params, &mut run.to_sign()).await?;
    update::persist(ctx, run).await
}

/// Responder role.
pub async fn respond(
    ctx: &FlowContext,
    message: &ProtocolMessage,
    params: TakeActionParams,
) -> Result<StateChannel, ProtocolError> {
    let pre = ctx.load_channel(&params.multisig_address).await?;
    ctx.ensure_members(&pre, &message.params)?;
    let new_state = next_state(ctx, &pre, &params).await?;
    let mut run = update::compute(ctx, &pre, &params.app_identity_hash, new_state)?;
    let reply = ctx.countersign(message, &mut run.to_sign()).await?;
    let channel = update::persist(ctx, run).await?;
    ctx.executor.send(reply).await?;
    Ok(channel)
}
