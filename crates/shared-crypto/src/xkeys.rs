//! # Extended Key Derivation (BIP-32)
//!
//! A participant is named by an extended public key (`xpub`). The signer for
//! index `k` is the non-hardened child `k` of that key: index 0 signs
//! channel-level commitments (setup, free balance), an app's sequence number
//! names its ephemeral signer.
//!
//! All derivations are pure functions of (extended key, index).

use crate::ecdsa::address_from_public_key;
use crate::CryptoError;
use hmac::{Hmac, Mac};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, ProjectivePoint, PublicKey, Scalar, SecretKey};
use sha2::Sha512;
use shared_types::Address;
use std::fmt;
use std::str::FromStr;

type HmacSha512 = Hmac<Sha512>;

/// Mainnet public version bytes (`xpub`).
pub const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];

/// First hardened child index.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

const SERIALIZED_LEN: usize = 78;

/// Split HMAC-SHA512(chain_code, data) into (IL, IR).
fn hmac_split(key: &[u8], data: &[u8]) -> Result<([u8; 32], [u8; 32]), CryptoError> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|_| CryptoError::InvalidPrivateKey)?;
    mac.update(data);
    let out = mac.finalize().into_bytes();
    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&out[..32]);
    ir.copy_from_slice(&out[32..]);
    Ok((il, ir))
}

fn parse_scalar(bytes: &[u8; 32]) -> Option<Scalar> {
    Scalar::from_repr(FieldBytes::clone_from_slice(bytes)).into()
}

fn child_tweak(
    chain_code: &[u8; 32],
    parent: &PublicKey,
    index: u32,
) -> Result<Scalar, CryptoError> {
    if index >= HARDENED_OFFSET {
        return Err(CryptoError::HardenedIndex(index));
    }
    let mut data = Vec::with_capacity(37);
    data.extend_from_slice(parent.to_encoded_point(true).as_bytes());
    data.extend_from_slice(&index.to_be_bytes());
    let (il, _) = hmac_split(chain_code, &data)?;
    parse_scalar(&il).ok_or(CryptoError::DerivationFailed(index))
}

fn truncate(key: &str) -> String {
    key.chars().take(16).collect()
}

/// A neutered (public-only) BIP-32 extended key.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    public_key: PublicKey,
}

impl ExtendedPublicKey {
    /// Public key of the child at non-hardened `index`.
    pub fn derive_public_key(&self, index: u32) -> Result<PublicKey, CryptoError> {
        let tweak = child_tweak(&self.chain_code, &self.public_key, index)?;
        let point = ProjectivePoint::GENERATOR * tweak + self.public_key.to_projective();
        PublicKey::from_affine(point.to_affine()).map_err(|_| CryptoError::DerivationFailed(index))
    }

    /// Address of the child at non-hardened `index`.
    pub fn derive_address(&self, index: u32) -> Result<Address, CryptoError> {
        Ok(address_from_public_key(&self.derive_public_key(index)?))
    }

    /// The key's own public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl FromStr for ExtendedPublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CryptoError::InvalidExtendedKey {
            key: truncate(s),
            reason: reason.to_string(),
        };
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| invalid(&e.to_string()))?;
        if bytes.len() != SERIALIZED_LEN {
            return Err(invalid("expected 78 bytes"));
        }
        if bytes[..4] != XPUB_VERSION {
            return Err(invalid("not an xpub"));
        }
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&bytes[5..9]);
        let mut child = [0u8; 4];
        child.copy_from_slice(&bytes[9..13]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&bytes[13..45]);
        let public_key =
            PublicKey::from_sec1_bytes(&bytes[45..78]).map_err(|_| invalid("bad public key"))?;
        Ok(Self {
            depth: bytes[4],
            parent_fingerprint,
            child_number: u32::from_be_bytes(child),
            chain_code,
            public_key,
        })
    }
}

impl fmt::Display for ExtendedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = Vec::with_capacity(SERIALIZED_LEN);
        bytes.extend_from_slice(&XPUB_VERSION);
        bytes.push(self.depth);
        bytes.extend_from_slice(&self.parent_fingerprint);
        bytes.extend_from_slice(&self.child_number.to_be_bytes());
        bytes.extend_from_slice(&self.chain_code);
        bytes.extend_from_slice(self.public_key.to_encoded_point(true).as_bytes());
        f.write_str(&bs58::encode(bytes).with_check().into_string())
    }
}

impl fmt::Debug for ExtendedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtendedPublicKey({})", self)
    }
}

/// A BIP-32 extended private key.
///
/// Used by the embedding signer to produce per-index signing keys. Key
/// custody is the embedder's concern; this type only derives.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    chain_code: [u8; 32],
    secret: SecretKey,
}

impl ExtendedPrivateKey {
    /// Master key from a seed (`HMAC-SHA512("Bitcoin seed", seed)`).
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let (il, chain_code) = hmac_split(b"Bitcoin seed", seed)?;
        let secret = SecretKey::from_slice(&il).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { chain_code, secret })
    }

    /// Random master key.
    pub fn random() -> Self {
        loop {
            let seed: [u8; 32] = rand::random();
            if let Ok(key) = Self::from_seed(&seed) {
                return key;
            }
        }
    }

    /// The neutered counterpart, serialized as a depth-0 `xpub`.
    pub fn neuter(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
            chain_code: self.chain_code,
            public_key: self.secret.public_key(),
        }
    }

    /// Signing key of the child at non-hardened `index`.
    pub fn derive_signing_key(&self, index: u32) -> Result<SigningKey, CryptoError> {
        let tweak = child_tweak(&self.chain_code, &self.secret.public_key(), index)?;
        let child = tweak + *self.secret.to_nonzero_scalar();
        let secret = SecretKey::from_bytes(&child.to_repr())
            .map_err(|_| CryptoError::DerivationFailed(index))?;
        Ok(SigningKey::from(secret))
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtendedPrivateKey({})", self.neuter())
    }
}

/// Address derived from `xpub` at index `k`.
pub fn xkey_kth_address(xpub: &str, k: u32) -> Result<Address, CryptoError> {
    xpub.parse::<ExtendedPublicKey>()?.derive_address(k)
}

/// Sort addresses ascending as unsigned 160-bit integers.
pub fn sort_addresses(addresses: &[Address]) -> Vec<Address> {
    let mut sorted = addresses.to_vec();
    sorted.sort();
    sorted
}

/// Addresses derived from each `xpub` at index `k`, sorted ascending.
pub fn xkeys_to_sorted_kth_addresses<S: AsRef<str>>(
    xpubs: &[S],
    k: u32,
) -> Result<Vec<Address>, CryptoError> {
    let addresses = xpubs
        .iter()
        .map(|xpub| xkey_kth_address(xpub.as_ref(), k))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sort_addresses(&addresses))
}

/// `xpubs` ordered by the address each derives at index `k`.
pub fn sort_xkeys_by_kth_address<S: AsRef<str> + Clone>(
    xpubs: &[S],
    k: u32,
) -> Result<Vec<S>, CryptoError> {
    let mut keyed = xpubs
        .iter()
        .map(|xpub| Ok((xkey_kth_address(xpub.as_ref(), k)?, xpub.clone())))
        .collect::<Result<Vec<_>, CryptoError>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, xpub)| xpub).collect())
}
