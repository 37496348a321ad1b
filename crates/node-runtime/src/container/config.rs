//! # Node Configuration
//!
//! Unified configuration for the protocol engine and the node's adapters.
//!
//! Defaults are usable as-is for a local node; `SC_*` environment variables
//! override individual fields.

use sc_01_channel_model::NetworkContext;
use sc_03_outcome_interpreter::OutcomeConfig;
use shared_types::Address;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Contract addresses the commitments point at.
    pub network: NetworkContext,
    /// Protocol run settings.
    pub protocol: ProtocolConfig,
    /// Multisig deployment settings.
    pub deploy: DeployConfig,
    /// Outcome read retry settings.
    pub outcome: OutcomeConfig,
    /// Seed for this node's extended private key (`SC_NODE_SEED`, hex). A random key is
    /// generated when absent.
    pub key_seed: Option<Vec<u8>>,
}

/// Protocol run configuration.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// How long an initiator waits for the counterparty's reply.
    pub io_send_and_wait_timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            io_send_and_wait_timeout: Duration::from_secs(90),
        }
    }
}

/// Multisig deployment configuration.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Deployment attempts before giving up.
    pub retry_count: u32,
    /// Sleep after attempt `n` is `backoff_unit * n`.
    pub backoff_unit: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value for {var}: {reason}")]
    InvalidVar {
        /// Variable name
        var: String,
        /// Parse failure
        reason: String,
    },

    /// A contract address the commitments need is unset.
    #[error("Network context address {0} is not configured")]
    MissingAddress(&'static str),

    /// A zero duration or count.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl NodeConfig {
    /// Defaults overlaid with `SC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let network = &mut config.network;
        for (var, slot) in [
            ("SC_CHALLENGE_REGISTRY", &mut network.challenge_registry),
            (
                "SC_CONDITIONAL_TRANSACTION_DELEGATE_TARGET",
                &mut network.conditional_transaction_delegate_target,
            ),
            ("SC_IDENTITY_APP", &mut network.identity_app),
            (
                "SC_MULTI_ASSET_INTERPRETER",
                &mut network.multi_asset_multi_party_coin_transfer_interpreter,
            ),
            (
                "SC_SINGLE_ASSET_INTERPRETER",
                &mut network.single_asset_two_party_coin_transfer_interpreter,
            ),
            (
                "SC_TWO_PARTY_FIXED_OUTCOME_INTERPRETER",
                &mut network.two_party_fixed_outcome_interpreter,
            ),
            ("SC_PROXY_FACTORY", &mut network.proxy_factory),
            ("SC_MINIMUM_VIABLE_MULTISIG", &mut network.minimum_viable_multisig),
            ("SC_COIN_BALANCE_REFUND_APP", &mut network.coin_balance_refund_app),
        ] {
            if let Some(value) = lookup(var) {
                *slot = parse_var(var, &value)?;
            }
        }

        if let Some(secs) = lookup("SC_IO_SEND_AND_WAIT_TIMEOUT_SECS") {
            config.protocol.io_send_and_wait_timeout =
                Duration::from_secs(parse_var("SC_IO_SEND_AND_WAIT_TIMEOUT_SECS", &secs)?);
        }
        if let Some(count) = lookup("SC_DEPLOY_RETRY_COUNT") {
            config.deploy.retry_count = parse_var("SC_DEPLOY_RETRY_COUNT", &count)?;
        }
        if let Some(ms) = lookup("SC_DEPLOY_BACKOFF_MS") {
            config.deploy.backoff_unit =
                Duration::from_millis(parse_var("SC_DEPLOY_BACKOFF_MS", &ms)?);
        }
        if let Some(attempts) = lookup("SC_OUTCOME_MAX_ATTEMPTS") {
            config.outcome.max_attempts = parse_var("SC_OUTCOME_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(seed) = lookup("SC_NODE_SEED") {
            let bytes = hex::decode(seed.trim_start_matches("0x")).map_err(|e| {
                ConfigError::InvalidVar {
                    var: "SC_NODE_SEED".into(),
                    reason: e.to_string(),
                }
            })?;
            config.key_seed = Some(bytes);
        }

        Ok(config)
    }

    /// Check the configuration can run protocols.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.identity_app == Address::ZERO {
            return Err(ConfigError::MissingAddress("identity_app"));
        }
        if self.network.challenge_registry == Address::ZERO {
            return Err(ConfigError::MissingAddress("challenge_registry"));
        }
        if self.protocol.io_send_and_wait_timeout.is_zero() {
            return Err(ConfigError::Zero("io_send_and_wait_timeout"));
        }
        if self.deploy.retry_count == 0 {
            return Err(ConfigError::Zero("deploy.retry_count"));
        }
        if self.outcome.max_attempts == 0 {
            return Err(ConfigError::Zero("outcome.max_attempts"));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.protocol.io_send_and_wait_timeout, Duration::from_secs(90));
        assert_eq!(config.deploy.retry_count, 3);
        assert_eq!(config.deploy.backoff_unit, Duration::from_secs(1));
        assert_eq!(config.outcome.max_attempts, 10);
    }

    #[test]
    fn test_env_overrides() {
        let registry = Address([0xCC; 20]);
        let config = NodeConfig::from_lookup(lookup(&[
            ("SC_CHALLENGE_REGISTRY", &registry.to_hex()),
            ("SC_IO_SEND_AND_WAIT_TIMEOUT_SECS", "5"),
            ("SC_DEPLOY_RETRY_COUNT", "7"),
            ("SC_NODE_SEED", "0x0102"),
        ]))
        .unwrap();
        assert_eq!(config.network.challenge_registry, registry);
        assert_eq!(config.protocol.io_send_and_wait_timeout, Duration::from_secs(5));
        assert_eq!(config.deploy.retry_count, 7);
        assert_eq!(config.key_seed, Some(vec![1, 2]));
    }

    #[test]
    fn test_bad_env_value_names_variable() {
        let err = NodeConfig::from_lookup(lookup(&[("SC_DEPLOY_RETRY_COUNT", "many")])).unwrap_err();
        assert!(err.to_string().contains("SC_DEPLOY_RETRY_COUNT"));
    }

    #[test]
    fn test_validate_rejects_unset_identity_app() {
        assert_eq!(
            NodeConfig::default().validate(),
            Err(ConfigError::MissingAddress("identity_app"))
        );
    }

    #[test]
    fn test_validate_accepts_configured_network() {
        let mut config = NodeConfig::default();
        config.network.identity_app = Address([0xFB; 20]);
        config.network.challenge_registry = Address([0xCC; 20]);
        assert!(config.validate().is_ok());

        config.deploy.retry_count = 0;
        assert_eq!(config.validate(), Err(ConfigError::Zero("deploy.retry_count")));
    }
}
