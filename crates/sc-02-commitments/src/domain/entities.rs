//! # Commitment Entities
//!
//! Transactions a commitment can produce and the tags persistence uses.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{hex_amount, Address};
use std::fmt;

/// A transaction ready for submission: target, value and calldata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalTransaction {
    /// Target contract.
    pub to: Address,
    /// Wei sent along.
    #[serde(with = "hex_amount")]
    pub value: U256,
    /// Calldata.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// How the multisig executes a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultisigOperation {
    /// Plain `call`.
    Call = 0,
    /// `delegatecall` into the target's code.
    DelegateCall = 1,
}

/// The three commitment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitmentKind {
    /// Channel setup (free balance effect).
    Setup,
    /// App or free balance state.
    SetState,
    /// Conditional payout of an installed app.
    Conditional,
}

impl CommitmentKind {
    /// Short name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentKind::Setup => "Setup",
            CommitmentKind::SetState => "SetState",
            CommitmentKind::Conditional => "Conditional",
        }
    }
}

impl fmt::Display for CommitmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde adapter for `Vec<u8>` as a `0x`-prefixed hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as hex.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Deserialize bytes from hex, with or without `0x`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_transaction_json_shape() {
        let tx = MinimalTransaction {
            to: Address([0x11; 20]),
            value: U256::zero(),
            data: vec![0xde, 0xad],
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["data"], "0xdead");
        assert_eq!(json["value"]["_hex"], "0x0");
        let back: MinimalTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_operation_discriminants() {
        assert_eq!(MultisigOperation::Call as u8, 0);
        assert_eq!(MultisigOperation::DelegateCall as u8, 1);
    }
}
