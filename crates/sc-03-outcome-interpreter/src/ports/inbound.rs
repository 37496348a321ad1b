//! # Inbound Ports (Driving Ports / API)

use crate::domain::errors::OutcomeError;
use async_trait::async_trait;
use sc_01_channel_model::AppInstance;
use shared_types::TokenIndexedCoinTransferMap;

/// Outcome interpretation API used by the uninstall flow.
#[async_trait]
pub trait OutcomeInterpreterApi: Send + Sync {
    /// Payouts of `app`'s current outcome, token to beneficiary to amount.
    ///
    /// `block_deadline` only matters for refund-style apps: past it a zero
    /// refund is accepted instead of retried.
    async fn compute_payouts(
        &self,
        app: &AppInstance,
        block_deadline: Option<u64>,
    ) -> Result<TokenIndexedCoinTransferMap, OutcomeError>;
}
