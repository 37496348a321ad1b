//! # SC-05 Protocol Flows
//!
//! The two-party protocols that move a channel from one agreed state to
//! the next: setup, propose, install, update, takeAction and uninstall.
//!
//! **Subsystem ID:** 05
//! **Architecture:** Hexagonal (DDD)
//!
//! ## Module Structure
//!
//! ```text
//! sc-05-protocol-flows/
//! ├── domain/
//! │   ├── signing   # SignatureRequest, counterparty signature checks
//! │   └── errors    # ProtocolError
//! ├── ports/
//! │   ├── inbound   # ProtocolRunnerApi
//! │   └── outbound  # StateChannelReader
//! ├── flows/        # One module per protocol, initiator + responder
//! └── service       # ProtocolRunner
//! ```
//!
//! ## Signing keys
//!
//! | Commitment | Key index |
//! |------------|-----------|
//! | Setup | 0 |
//! | Free balance SetState | 0 |
//! | App SetState | app seq no |
//! | Conditional | app seq no |
//!
//! Nothing is persisted until every counterparty signature has been
//! verified, so a failed run leaves the channel at its pre-protocol state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod flows;
pub mod ports;
pub mod service;

#[cfg(test)]
mod testing;

// Re-exports
pub use domain::{ProtocolError, SignatureRequest, FREE_BALANCE_KEY_INDEX};
pub use flows::FlowContext;
pub use ports::{ProtocolRunnerApi, StateChannelReader, StoreError};
pub use service::ProtocolRunner;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
