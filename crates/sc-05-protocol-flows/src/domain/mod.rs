//! Domain layer for the protocol flows.

pub mod errors;
pub mod signing;

pub use errors::ProtocolError;
pub use signing::{SignatureRequest, FREE_BALANCE_KEY_INDEX};
