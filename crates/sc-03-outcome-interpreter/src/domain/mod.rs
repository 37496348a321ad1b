//! # Domain Module
//!
//! Pure outcome decoding and its errors.

pub mod decode;
pub mod errors;

pub use decode::*;
pub use errors::*;
