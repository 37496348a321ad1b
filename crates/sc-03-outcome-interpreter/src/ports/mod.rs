//! # Ports
//!
//! - `inbound`: the interpreter API
//! - `outbound`: chain reads the interpreter depends on

pub mod inbound;
pub mod outbound;

pub use inbound::OutcomeInterpreterApi;
pub use outbound::{ChainError, ChainReader};
