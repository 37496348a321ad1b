//! # Outbound Ports (Driven Ports / SPI)
//!
//! Read-only access to the chain. Every call is idempotent and may return
//! stale data.

use async_trait::async_trait;
use sc_01_channel_model::AppInstance;
use serde_json::Value;
use shared_types::Address;
use thiserror::Error;

/// Error from chain reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The node or provider could not be reached.
    #[error("Chain provider unavailable: {0}")]
    Unavailable(String),

    /// The app definition call reverted.
    #[error("Call to app definition {app_definition} reverted: {reason}")]
    Reverted {
        /// App definition contract
        app_definition: Address,
        /// Revert reason
        reason: String,
    },

    /// No contract code at the app definition address.
    #[error("No app logic deployed at {0}")]
    UnknownAppDefinition(Address),
}

/// Read-only view of the chain used while interpreting outcomes and actions.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `computeOutcome(encodedState)` on the app definition.
    async fn compute_outcome(&self, app: &AppInstance) -> Result<Vec<u8>, ChainError>;

    /// `applyAction(encodedState, encodedAction)` on the app definition.
    async fn compute_state_transition(
        &self,
        app: &AppInstance,
        action: &Value,
    ) -> Result<Value, ChainError>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64, ChainError>;
}
