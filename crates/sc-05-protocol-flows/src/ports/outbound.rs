//! Outbound ports: what flows read from the embedding node.

use async_trait::async_trait;
use sc_01_channel_model::StateChannel;
use shared_types::Address;
use thiserror::Error;

/// Store failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be read.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to persisted channels.
///
/// Writes go through persist instructions, never through this port.
#[async_trait]
pub trait StateChannelReader: Send + Sync {
    /// Channel for `multisig`, if one exists.
    async fn get_state_channel(&self, multisig: &Address) -> Result<Option<StateChannel>, StoreError>;
}
