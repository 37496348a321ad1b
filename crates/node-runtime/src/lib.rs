//! # Node Runtime
//!
//! A runnable state channel node: the protocol engine from `sc-05` wired
//! to in-memory adapters, behind method controllers that take the
//! per-channel locks and call the protocol runner.
//!
//! ## Module Structure
//!
//! ```text
//! node-runtime/
//! ├── adapters/     # KeySigner, MessageBus, MemoryStore, MemoryChain, NamedLocks
//! ├── container/    # NodeConfig, Node (wiring + inbound loop)
//! ├── controllers/  # create_channel, propose_install, install, rescind_deposit_rights, ...
//! ├── ports         # StateDepositHolderDeployer, BalanceReader
//! └── errors        # NodeError
//! ```
//!
//! The binary (`main.rs`) reads `NodeConfig` from the environment and runs
//! a single node until interrupted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod container;
pub mod controllers;
pub mod errors;
pub mod ports;

#[cfg(test)]
mod testing;

// Re-exports
pub use adapters::{AppLogic, BusMessage, MemoryChain, MemoryStore, MessageBus, NamedLocks};
pub use container::{ConfigError, Node, NodeConfig};
pub use controllers::{ProposeInstallRequest, RescindDepositRights};
pub use errors::NodeError;
pub use ports::{BalanceReader, StateDepositHolderDeployer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
