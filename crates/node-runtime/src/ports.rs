//! # Node Ports
//!
//! Chain access the node needs beyond the flows' `ChainReader`.

use async_trait::async_trait;
use primitive_types::U256;
use sc_03_outcome_interpreter::ChainError;
use shared_types::Address;

/// Deploys the multisig (state deposit holder) backing a channel.
#[async_trait]
pub trait StateDepositHolderDeployer: Send + Sync {
    /// Whether contract code exists at `multisig`.
    async fn is_deployed(&self, multisig: &Address) -> Result<bool, ChainError>;

    /// Submit the proxy creation for `multisig` with `owners`.
    async fn deploy(&self, multisig: &Address, owners: &[Address]) -> Result<(), ChainError>;

    /// Owners of the deployed multisig, as the chain reports them.
    async fn owners(&self, multisig: &Address) -> Result<Vec<Address>, ChainError>;
}

/// Token balances held on chain.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    /// Balance of `holder` in `token`. The zero address means ETH.
    async fn balance_of(&self, holder: &Address, token: &Address) -> Result<U256, ChainError>;
}
