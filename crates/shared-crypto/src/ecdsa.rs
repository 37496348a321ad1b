//! # Recoverable ECDSA Signatures (secp256k1)
//!
//! Signatures are 65 bytes, `r ‖ s ‖ v` with `v ∈ {27, 28}`, hex-encoded on
//! the wire. Digests are signed as-is (no message prefix); the commitment
//! layer already domain-separates its encodings.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization (EIP-2); `v` is flipped to match
//! - Signer identity is always *recovered* from (digest, signature)

use crate::hashing::keccak256;
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shared_types::{Address, Bytes32};
use std::fmt;
use std::str::FromStr;

/// A 65-byte recoverable signature, `r ‖ s ‖ v`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 65]);

impl Signature {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Recovery byte.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Signature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(body).map_err(|_| CryptoError::InvalidSignatureFormat(s.to_string()))?;
        let bytes: [u8; 65] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sign a 32-byte digest.
pub fn sign_digest(key: &SigningKey, digest: &Bytes32) -> Result<Signature, CryptoError> {
    let (sig, recid) = key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    // Normalizing s negates the nonce point, which flips its y parity.
    let (sig, recid) = match sig.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced()),
        ),
        None => (sig, recid),
    };

    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&sig.to_bytes());
    bytes[64] = recid.to_byte() + 27;
    Ok(Signature(bytes))
}

/// Recover the signer address of `signature` over `digest`.
pub fn recover_address(digest: &Bytes32, signature: &Signature) -> Result<Address, CryptoError> {
    let recovery_id = parse_recovery_id(signature.v())?;
    let sig = K256Signature::from_slice(&signature.0[..64])
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;
    let recovered = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed {
            digest: digest.to_hex(),
        })?;
    Ok(address_from_verifying_key(&recovered))
}

/// Ethereum address of a verifying key.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    address_from_public_key(&PublicKey::from(key))
}

/// Ethereum address of a public key: last 20 bytes of keccak-256 over the
/// uncompressed point without its `0x04` prefix.
pub fn address_from_public_key(key: &PublicKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash.0[12..]);
    Address(address)
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, CryptoError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(CryptoError::InvalidRecoveryId(v)),
    };
    RecoveryId::from_byte(id).ok_or(CryptoError::InvalidRecoveryId(v))
}
