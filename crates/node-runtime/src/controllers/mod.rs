//! # Controllers
//!
//! The node's public methods. Each validates its input, takes the named
//! locks for the channel (and app, for per-app methods) and then starts a
//! protocol run or reads the store. Locks are released when the guard
//! drops, whichever way the method returns.
//!
//! | Method | Locks | Protocol |
//! |--------|-------|----------|
//! | `create_channel` | multisig | setup |
//! | `deploy_state_deposit_holder` | multisig | none (chain) |
//! | `rescind_deposit_rights` | multisig | uninstall (refund app, if any) |
//! | `propose_install` | multisig | propose |
//! | `install` | multisig, app | install |
//! | `reject_install` | multisig, app | none (notification) |
//! | `update_state` | multisig, app | update |
//! | `take_action` | multisig, app | takeAction |
//! | `uninstall` | multisig, app | uninstall |

pub mod app;
pub mod channel;
pub mod install;
pub mod query;

pub use channel::RescindDepositRights;
pub use install::ProposeInstallRequest;

use crate::adapters::MemoryStore;
use crate::errors::NodeError;
use sc_01_channel_model::{AppInstanceProposal, StateChannel};
use sc_04_instruction_executor::{AppRecord, PersistAppType};
use sc_05_protocol_flows::FlowContext;
use shared_types::{Address, Bytes32};
use tracing::info;

/// Lock names for a run over `multisig` and, if given, `app`.
pub(crate) fn lock_names(multisig: Address, app: Option<Bytes32>) -> Vec<String> {
    let mut names = vec![multisig.to_hex()];
    if let Some(app) = app {
        names.push(app.to_hex());
    }
    names
}

/// Fails with `NoAppInstanceId` when `app` is the zero hash.
pub(crate) fn require_app_id(app: Bytes32, action: &'static str) -> Result<Bytes32, NodeError> {
    if app.is_zero() {
        return Err(NodeError::NoAppInstanceId(action));
    }
    Ok(app)
}

/// The other member of `channel`.
pub(crate) fn counterparty(channel: &StateChannel, us: &str) -> Result<String, NodeError> {
    channel
        .user_neutered_extended_keys()
        .iter()
        .find(|k| k.as_str() != us)
        .cloned()
        .ok_or_else(|| NodeError::NotAChannelMember {
            xpub: us.to_string(),
            multisig: channel.multisig_address(),
        })
}

/// Drop proposal `app` from the stored channel at `multisig`, on behalf
/// of channel member `by`.
pub(crate) async fn remove_proposal(
    ctx: &FlowContext,
    store: &MemoryStore,
    by: &str,
    multisig: Address,
    app: Bytes32,
) -> Result<AppInstanceProposal, NodeError> {
    let channel = store
        .channel(&multisig)
        .ok_or(NodeError::ChannelNotFound(multisig))?;
    if !channel.user_neutered_extended_keys().iter().any(|k| k == by) {
        return Err(NodeError::NotAChannelMember {
            xpub: by.to_string(),
            multisig,
        });
    }
    let proposal = channel.get_proposal(&app)?.clone();
    let next = channel.remove_proposal(&app)?;
    ctx.executor
        .persist_app_instance(
            PersistAppType::Reject,
            next,
            AppRecord::Proposal(proposal.clone()),
        )
        .await?;
    info!(%multisig, %app, "[node] proposal removed");
    Ok(proposal)
}
