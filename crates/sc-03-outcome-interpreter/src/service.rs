//! # Outcome Interpreter Service
//!
//! Reads an app's outcome through the [`ChainReader`] port and decodes it.
//!
//! Refund-style apps (state has a `threshold` field) pay out an on-chain
//! balance the chain reader may not have indexed yet. Their outcome is
//! re-read with linear backoff until the payout is non-zero, or the
//! caller's block deadline has passed and a zero payout is acceptable.

use crate::domain::decode::{decode_outcome, is_refund_app, refund_token, total_payout};
use crate::domain::errors::OutcomeError;
use crate::ports::inbound::OutcomeInterpreterApi;
use crate::ports::outbound::ChainReader;
use async_trait::async_trait;
use sc_01_channel_model::AppInstance;
use shared_types::TokenIndexedCoinTransferMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Refund retry settings.
#[derive(Debug, Clone)]
pub struct OutcomeConfig {
    /// Outcome reads before giving up.
    pub max_attempts: u32,
    /// Sleep after attempt `n` is `backoff_unit * n`.
    pub backoff_unit: Duration,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Outcome interpreter backed by a chain reader.
pub struct OutcomeInterpreterService {
    chain: Arc<dyn ChainReader>,
    config: OutcomeConfig,
}

impl OutcomeInterpreterService {
    /// Create a new interpreter.
    pub fn new(chain: Arc<dyn ChainReader>, config: OutcomeConfig) -> Self {
        Self { chain, config }
    }

    async fn read_once(&self, app: &AppInstance) -> Result<TokenIndexedCoinTransferMap, OutcomeError> {
        let encoded = self.chain.compute_outcome(app).await?;
        decode_outcome(app, &encoded, None)
    }

    async fn read_refund(
        &self,
        app: &AppInstance,
        block_deadline: Option<u64>,
    ) -> Result<TokenIndexedCoinTransferMap, OutcomeError> {
        let id = app.identity_hash();
        let token = refund_token(app);
        for attempt in 1..=self.config.max_attempts {
            let encoded = self.chain.compute_outcome(app).await?;
            let payouts = decode_outcome(app, &encoded, token)?;
            if !total_payout(&payouts).is_zero() {
                return Ok(payouts);
            }
            if let Some(deadline) = block_deadline {
                if self.chain.block_number().await? >= deadline {
                    debug!(app = %id, deadline, "[sc-03] accepting zero refund at deadline");
                    return Ok(payouts);
                }
            }
            debug!(app = %id, attempt, "[sc-03] refund outcome still zero, retrying");
            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.backoff_unit * attempt).await;
            }
        }
        warn!(app = %id, attempts = self.config.max_attempts, "[sc-03] no refund deposit found");
        Err(OutcomeError::NoDepositFound {
            app: id,
            attempts: self.config.max_attempts,
        })
    }
}

#[async_trait]
impl OutcomeInterpreterApi for OutcomeInterpreterService {
    async fn compute_payouts(
        &self,
        app: &AppInstance,
        block_deadline: Option<u64>,
    ) -> Result<TokenIndexedCoinTransferMap, OutcomeError> {
        if is_refund_app(app) {
            self.read_refund(app, block_deadline).await
        } else {
            self.read_once(app).await
        }
    }
}
