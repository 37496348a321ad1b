//! # Commitment Records
//!
//! A signed commitment of any kind, as handed to persistence.

use super::conditional::ConditionalTransactionCommitment;
use super::entities::CommitmentKind;
use super::set_state::SetStateCommitment;
use super::setup::SetupCommitment;
use crate::ports::Commitment;
use serde::{Deserialize, Serialize};
use shared_types::Bytes32;

/// One commitment of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "commitment", rename_all = "camelCase")]
pub enum CommitmentRecord {
    /// Channel setup.
    Setup(SetupCommitment),
    /// App or free balance state.
    SetState(SetStateCommitment),
    /// Conditional payout.
    Conditional(ConditionalTransactionCommitment),
}

impl CommitmentRecord {
    /// Commitment kind.
    pub fn kind(&self) -> CommitmentKind {
        self.as_commitment().kind()
    }

    /// Digest the signatures are over.
    pub fn hash_to_sign(&self) -> Bytes32 {
        self.as_commitment().hash_to_sign()
    }

    /// The record as a trait object.
    pub fn as_commitment(&self) -> &dyn Commitment {
        match self {
            CommitmentRecord::Setup(c) => c,
            CommitmentRecord::SetState(c) => c,
            CommitmentRecord::Conditional(c) => c,
        }
    }
}

impl From<SetupCommitment> for CommitmentRecord {
    fn from(c: SetupCommitment) -> Self {
        CommitmentRecord::Setup(c)
    }
}

impl From<SetStateCommitment> for CommitmentRecord {
    fn from(c: SetStateCommitment) -> Self {
        CommitmentRecord::SetState(c)
    }
}

impl From<ConditionalTransactionCommitment> for CommitmentRecord {
    fn from(c: ConditionalTransactionCommitment) -> Self {
        CommitmentRecord::Conditional(c)
    }
}
