//! # Domain Invariants
//!
//! Checks shared by the channel transitions. Each returns the error the
//! transition surfaces so callers can use `?` directly.

use super::errors::ModelError;
use serde_json::Value;
use shared_crypto::abi::encode_value;
use shared_types::{Address, Bytes32};

/// Number of participants in every channel.
pub const CHANNEL_PARTICIPANTS: usize = 2;

/// Invariant: a channel has exactly two participants.
pub fn invariant_two_participants(count: usize) -> Result<(), ModelError> {
    if count != CHANNEL_PARTICIPANTS {
        return Err(ModelError::InvalidParticipantCount(count));
    }
    Ok(())
}

/// Invariant: `state` is encodable with `encoding`.
///
/// Both parties hash the encoded state, so a state one side cannot encode
/// would stall the protocol after signatures were already exchanged.
pub fn invariant_state_encodable(encoding: &str, state: &Value) -> Result<(), ModelError> {
    encode_value(encoding, state)
        .map(|_| ())
        .map_err(|e| ModelError::StateNotEncodable(e.to_string()))
}

/// Invariant: an app's participants are the signing keys at its sequence number.
pub fn invariant_participants_match(
    app: Bytes32,
    expected: &[Address],
    actual: &[Address],
) -> Result<(), ModelError> {
    if expected != actual {
        return Err(ModelError::ParticipantMismatch {
            app,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

/// Invariant: the free balance is never the subject of install or uninstall.
pub fn invariant_not_free_balance(
    app: &Bytes32,
    free_balance: &Bytes32,
    multisig: Address,
) -> Result<(), ModelError> {
    if app == free_balance {
        return Err(ModelError::FreeBalanceNotAllowed(multisig));
    }
    Ok(())
}
