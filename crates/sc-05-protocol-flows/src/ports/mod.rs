//! Ports for the protocol flows.

pub mod inbound;
pub mod outbound;

pub use inbound::ProtocolRunnerApi;
pub use outbound::{StateChannelReader, StoreError};
