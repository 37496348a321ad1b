//! # Signature Requests
//!
//! Which digests a flow signs, with which key, and under which
//! `customData` key the signature travels. Checking the counterparty's
//! signature is the only place counterparty input is trusted.

use super::errors::ProtocolError;
use sc_02_commitments::assert_is_valid_signature;
use sc_04_instruction_executor::ProtocolMessage;
use shared_crypto::{xkey_kth_address, Signature};
use shared_types::Bytes32;

/// Key index for channel-level commitments (setup, free balance).
pub const FREE_BALANCE_KEY_INDEX: u32 = 0;

/// `customData` key of the first signature.
pub const SIGNATURE: &str = "signature";

/// `customData` key of the second signature (install's free balance update).
pub const SIGNATURE2: &str = "signature2";

/// One digest both parties sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureRequest {
    /// `customData` key.
    pub key: &'static str,
    /// Commitment hash.
    pub digest: Bytes32,
    /// Derivation index of the signing key.
    pub key_index: u32,
}

impl SignatureRequest {
    /// Request under `key` for `digest` at `key_index`.
    pub fn new(key: &'static str, digest: Bytes32, key_index: u32) -> Self {
        Self {
            key,
            digest,
            key_index,
        }
    }

    /// The counterparty's signature from `message`, checked against the
    /// address `counterparty_xpub` derives at this request's index.
    pub fn counterparty_signature(
        &self,
        message: &ProtocolMessage,
        counterparty_xpub: &str,
    ) -> Result<Signature, ProtocolError> {
        let signature =
            message
                .signature(self.key)
                .ok_or_else(|| ProtocolError::MissingSignature {
                    protocol: message.protocol(),
                    process_id: message.process_id.clone(),
                    key: self.key,
                })?;
        let expected = xkey_kth_address(counterparty_xpub, self.key_index)?;
        assert_is_valid_signature(expected, &self.digest, &signature)?;
        Ok(signature)
    }
}
