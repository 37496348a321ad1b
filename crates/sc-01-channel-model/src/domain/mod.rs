//! # Domain Module
//!
//! Core value types of the channel data model.

pub mod app_instance;
pub mod errors;
pub mod free_balance;
pub mod invariants;
pub mod proposal;
pub mod state_channel;
pub mod value_objects;

pub use app_instance::*;
pub use errors::*;
pub use free_balance::*;
pub use invariants::*;
pub use proposal::*;
pub use state_channel::*;
pub use value_objects::*;
