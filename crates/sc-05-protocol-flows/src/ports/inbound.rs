//! Inbound port: starting and answering protocol runs.

use crate::domain::errors::ProtocolError;
use async_trait::async_trait;
use sc_01_channel_model::StateChannel;
use sc_04_instruction_executor::{ProtocolMessage, ProtocolParams};

/// Protocol runner API.
#[async_trait]
pub trait ProtocolRunnerApi: Send + Sync {
    /// Run the initiator role of the protocol `params` name.
    ///
    /// Returns the channel as persisted at the end of the run.
    async fn initiate(&self, params: ProtocolParams) -> Result<StateChannel, ProtocolError>;

    /// Run the responder role for an incoming step-1 message.
    async fn respond(&self, message: ProtocolMessage) -> Result<StateChannel, ProtocolError>;
}
