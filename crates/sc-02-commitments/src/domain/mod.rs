//! # Domain Module
//!
//! Commitment encodings, signature checks and the transactions they produce.

pub mod conditional;
pub mod entities;
pub mod errors;
pub mod multisig;
pub mod record;
pub mod set_state;
pub mod setup;
pub mod signatures;

pub use conditional::*;
pub use entities::*;
pub use errors::*;
pub use record::*;
pub use set_state::{SetStateCommitment, SetStateCommitmentJson};
pub use setup::*;
pub use signatures::*;
