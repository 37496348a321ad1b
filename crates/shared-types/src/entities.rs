//! # Core Value Types
//!
//! - **Identity**: `Address` (20 bytes), `Bytes32` (identity hashes, state hashes, digests)
//! - **Balances**: token-indexed coin transfer maps and signed balance deltas

use crate::errors::TypeError;
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Decode a `0x`-prefixed (or bare) hex string into exactly `N` bytes.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypeError> {
    let trimmed = s.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(body).map_err(|_| TypeError::InvalidHex(s.to_string()))?;
    if bytes.len() != N {
        return Err(TypeError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Byte length of this type.
            pub const LEN: usize = $len;

            /// All-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Lowercase `0x`-prefixed hex.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// Returns true if every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed::<$len>(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// A 20-byte Ethereum-style address.
    ///
    /// Ordering is byte-lexicographic, which equals ordering the address as
    /// an unsigned big-endian integer.
    Address,
    20
);

fixed_bytes!(
    /// A 32-byte value: keccak digests, app identity hashes, state hashes.
    Bytes32,
    32
);

impl Address {
    /// Left-pad to a 32-byte ABI word.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

/// Beneficiary address to amount.
pub type CoinTransferMap = BTreeMap<Address, U256>;

/// Token address to coin transfer map.
pub type TokenIndexedCoinTransferMap = BTreeMap<Address, CoinTransferMap>;

/// Token address to beneficiary address to signed delta.
pub type TokenIndexedIncrements = BTreeMap<Address, BTreeMap<Address, BalanceDelta>>;

/// A signed change to a single balance.
///
/// Amounts are unsigned 256-bit values, so the sign is carried by the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceDelta {
    /// Add to the balance.
    Credit(U256),
    /// Subtract from the balance.
    Debit(U256),
}

impl BalanceDelta {
    /// Apply this delta to `balance`.
    ///
    /// Returns `None` if the result would be negative or overflow.
    pub fn apply(self, balance: U256) -> Option<U256> {
        match self {
            BalanceDelta::Credit(amount) => balance.checked_add(amount),
            BalanceDelta::Debit(amount) => balance.checked_sub(amount),
        }
    }

    /// Magnitude of the delta.
    pub fn amount(&self) -> U256 {
        match self {
            BalanceDelta::Credit(amount) | BalanceDelta::Debit(amount) => *amount,
        }
    }
}

/// Turn a payout map into credit increments.
pub fn credits(transfers: &TokenIndexedCoinTransferMap) -> TokenIndexedIncrements {
    transfers
        .iter()
        .map(|(token, map)| {
            let deltas = map
                .iter()
                .map(|(to, amount)| (*to, BalanceDelta::Credit(*amount)))
                .collect();
            (*token, deltas)
        })
        .collect()
}
