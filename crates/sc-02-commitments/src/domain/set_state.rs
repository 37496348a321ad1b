//! # SetState Commitment
//!
//! Commits to an app's state hash at a version and timeout. Submitted to the
//! challenge registry.
//!
//! ```text
//! encode = 0x19 ‖ identityHash ‖ uint256 versionNumber ‖ uint256 timeout ‖ appStateHash
//! ```

use super::entities::{CommitmentKind, MinimalTransaction};
use super::errors::CommitmentError;
use super::signatures::sort_signatures_by_signer_address;
use crate::ports::{require_two, Commitment};
use primitive_types::U256;
use sc_01_channel_model::{AppIdentity, AppInstance, NetworkContext};
use serde::{Deserialize, Serialize};
use shared_crypto::abi::{encode_call, Token};
use shared_crypto::Signature;
use shared_types::{Address, Bytes32};

const SET_STATE_SIGNATURE: &str =
    "setState((uint256,address[],address,uint256),(bytes32,uint256,uint256,bytes[]))";

/// Big-endian 32-byte word of `value`.
pub(crate) fn word(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Commitment to an app's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SetStateCommitmentJson", into = "SetStateCommitmentJson")]
pub struct SetStateCommitment {
    /// Challenge registry the transaction targets.
    pub challenge_registry_address: Address,
    /// Identity of the subject app.
    pub app_identity: AppIdentity,
    /// Hash of the encoded state.
    pub app_state_hash: Bytes32,
    /// State version.
    pub version_number: u64,
    /// State timeout in blocks.
    pub timeout: u64,
    signatures: Vec<Signature>,
}

impl SetStateCommitment {
    /// Unsigned commitment.
    pub fn new(
        network: &NetworkContext,
        app_identity: AppIdentity,
        app_state_hash: Bytes32,
        version_number: u64,
        timeout: u64,
    ) -> Self {
        Self {
            challenge_registry_address: network.challenge_registry,
            app_identity,
            app_state_hash,
            version_number,
            timeout,
            signatures: Vec::new(),
        }
    }

    /// Unsigned commitment over `app`'s latest state.
    pub fn for_app(network: &NetworkContext, app: &AppInstance) -> Result<Self, CommitmentError> {
        Ok(Self::new(
            network,
            app.identity(),
            app.state_hash()?,
            app.latest_version_number,
            app.latest_timeout,
        ))
    }

    /// Identity hash of the subject app.
    pub fn app_identity_hash(&self) -> Bytes32 {
        self.app_identity.identity_hash()
    }
}

impl Commitment for SetStateCommitment {
    fn kind(&self) -> CommitmentKind {
        CommitmentKind::SetState
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 32 * 4);
        out.push(0x19);
        out.extend_from_slice(self.app_identity_hash().as_bytes());
        out.extend_from_slice(&word(U256::from(self.version_number)));
        out.extend_from_slice(&word(U256::from(self.timeout)));
        out.extend_from_slice(self.app_state_hash.as_bytes());
        out
    }

    fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    fn set_signatures(&mut self, signatures: Vec<Signature>) -> Result<(), CommitmentError> {
        require_two(self.kind(), &signatures)?;
        self.signatures = signatures;
        Ok(())
    }

    fn get_signed_transaction(&self) -> Result<MinimalTransaction, CommitmentError> {
        require_two(self.kind(), &self.signatures)?;
        let sorted = sort_signatures_by_signer_address(&self.hash_to_sign(), &self.signatures)?;
        let update = Token::Tuple(vec![
            Token::FixedBytes(self.app_state_hash.as_bytes().to_vec()),
            Token::Uint(U256::from(self.version_number)),
            Token::Uint(U256::from(self.timeout)),
            Token::Array(
                sorted
                    .iter()
                    .map(|s| Token::Bytes(s.as_bytes().to_vec()))
                    .collect(),
            ),
        ]);
        Ok(MinimalTransaction {
            to: self.challenge_registry_address,
            value: U256::zero(),
            data: encode_call(SET_STATE_SIGNATURE, &[self.app_identity.to_token(), update]),
        })
    }
}

/// Persisted shape of a [`SetStateCommitment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStateCommitmentJson {
    app_identity_hash: Bytes32,
    app_identity: AppIdentity,
    app_state_hash: Bytes32,
    challenge_registry_address: Address,
    signatures: Vec<Signature>,
    timeout: u64,
    version_number: u64,
}

impl From<SetStateCommitment> for SetStateCommitmentJson {
    fn from(c: SetStateCommitment) -> Self {
        Self {
            app_identity_hash: c.app_identity_hash(),
            app_identity: c.app_identity,
            app_state_hash: c.app_state_hash,
            challenge_registry_address: c.challenge_registry_address,
            signatures: c.signatures,
            timeout: c.timeout,
            version_number: c.version_number,
        }
    }
}

impl TryFrom<SetStateCommitmentJson> for SetStateCommitment {
    type Error = CommitmentError;

    fn try_from(json: SetStateCommitmentJson) -> Result<Self, Self::Error> {
        let computed = json.app_identity.identity_hash();
        if computed != json.app_identity_hash {
            return Err(CommitmentError::IdentityHashMismatch {
                stored: json.app_identity_hash,
                computed,
            });
        }
        Ok(Self {
            challenge_registry_address: json.challenge_registry_address,
            app_identity: json.app_identity,
            app_state_hash: json.app_state_hash,
            version_number: json.version_number,
            timeout: json.timeout,
            signatures: json.signatures,
        })
    }
}
