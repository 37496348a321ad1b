//! # Adapter Implementations
//!
//! Concrete, in-memory implementations of every port the protocol engine
//! and the controllers depend on.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  OUTER LAYER (Adapters)                      │
//! │  KeySigner   BusTransport   MemoryStore   MemoryChain        │
//! │                      ↑ implements ↑                          │
//! │                  MIDDLE LAYER (Ports)                        │
//! │  Middleware   StateChannelReader   ChainReader   Deployer    │
//! │                        ↑ uses ↑                              │
//! │                  INNER LAYER (Domain)                        │
//! │  channel model, commitments, protocol flows                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod chain;
pub mod locks;
pub mod signer;
pub mod store;

pub use bus::{BusError, BusMessage, BusTransport, MessageBus};
pub use chain::{AppLogic, MemoryChain};
pub use locks::{LockGuard, NamedLocks};
pub use signer::KeySigner;
pub use store::MemoryStore;
