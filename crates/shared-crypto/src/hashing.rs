//! # Keccak-256 Hashing
//!
//! The Ethereum variant of SHA-3 (pre-standard padding). Every digest a
//! commitment is signed over, and every identity and state hash, uses it.

use sha3::{Digest, Keccak256};
use shared_types::Bytes32;

/// Hash data with keccak-256 (one-shot).
pub fn keccak256(data: &[u8]) -> Bytes32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Bytes32(hasher.finalize().into())
}

/// Hash the concatenation of multiple inputs.
pub fn keccak256_many(inputs: &[&[u8]]) -> Bytes32 {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    Bytes32(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_vector() {
        assert_eq!(
            keccak256(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_function_selector_vector() {
        let digest = keccak256(b"transfer(address,uint256)");
        assert_eq!(&digest.0[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_many_equals_concatenation() {
        assert_eq!(keccak256_many(&[&b"ab"[..], &b"cd"[..]]), keccak256(b"abcd"));
    }
}
