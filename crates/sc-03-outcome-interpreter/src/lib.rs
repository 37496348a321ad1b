//! # SC-03 Outcome Interpreter
//!
//! Turns a finalizing app's outcome into free balance payouts.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (DDD)
//!
//! ## Module Structure
//!
//! ```text
//! sc-03-outcome-interpreter/
//! ├── domain/
//! │   ├── decode    # Per-outcome-type decoding (pure)
//! │   └── errors    # OutcomeError
//! ├── ports/
//! │   ├── inbound   # OutcomeInterpreterApi
//! │   └── outbound  # ChainReader
//! └── service       # OutcomeInterpreterService (refund retry loop)
//! ```
//!
//! Decode failures and unknown layouts are fatal; nothing defaults to an
//! empty payout.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use domain::{decode_outcome, is_refund_app, OutcomeError};
pub use ports::{ChainError, ChainReader, OutcomeInterpreterApi};
pub use service::{OutcomeConfig, OutcomeInterpreterService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
