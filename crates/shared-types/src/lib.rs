//! # Shared Types Crate
//!
//! Primitive value types used by every state channel crate.
//!
//! ## Design Principles
//!
//! - **Byte-level identity**: addresses and hashes are fixed-size byte arrays.
//!   Equality and ordering work on the bytes, so hex case never matters.
//! - **Canonical ordering**: `Address` orders as an unsigned 160-bit integer,
//!   which is the order commitments expect for participants and signatures.
//! - **Lossless JSON**: amounts serialize as `{"_hex": "0x.."}` objects so a
//!   persisted channel deserializes back to the identical value.

pub mod amounts;
pub mod entities;
pub mod errors;

pub use amounts::*;
pub use entities::*;
pub use errors::*;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;
