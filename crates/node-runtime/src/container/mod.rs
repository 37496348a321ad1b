//! # Node Container
//!
//! Holds the protocol runner and the adapters it runs against, wired
//! together once at startup.

pub mod config;
pub mod node;

pub use config::{ConfigError, DeployConfig, NodeConfig, ProtocolConfig};
pub use node::Node;
