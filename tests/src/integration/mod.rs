//! Cross-node protocol runs.

pub mod harness;
mod lifecycle;
