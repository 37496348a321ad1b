//! # Multisig Transaction Hashing
//!
//! Setup and conditional commitments are transactions executed by the
//! channel's multisig. The owners sign
//!
//! ```text
//! keccak256(0x19 ‖ owners[i] as 32-byte words ‖ to ‖ value ‖ keccak256(data) ‖ operation)
//! ```
//!
//! with `to` packed as 20 bytes and `operation` as one byte.

use super::entities::{MinimalTransaction, MultisigOperation};
use super::errors::CommitmentError;
use super::set_state::word;
use super::signatures::sort_signatures_by_signer_address;
use primitive_types::U256;
use shared_crypto::abi::{encode_call, Token};
use shared_crypto::{keccak256, Signature};
use shared_types::{Address, Bytes32};

const EXEC_TRANSACTION_SIGNATURE: &str = "execTransaction(address,uint256,bytes,uint8,bytes[])";

/// Packed multisig encoding of `tx` for `owners`.
pub fn encode_multisig_transaction(
    owners: &[Address],
    tx: &MinimalTransaction,
    operation: MultisigOperation,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 32 * owners.len() + 20 + 32 + 32 + 1);
    out.push(0x19);
    for owner in owners {
        out.extend_from_slice(&owner.to_word());
    }
    out.extend_from_slice(tx.to.as_bytes());
    out.extend_from_slice(&word(tx.value));
    out.extend_from_slice(keccak256(&tx.data).as_bytes());
    out.push(operation as u8);
    out
}

/// `execTransaction` on `multisig` carrying `tx` and the owners' signatures.
pub fn exec_transaction(
    multisig: Address,
    tx: &MinimalTransaction,
    operation: MultisigOperation,
    hash: &Bytes32,
    signatures: &[Signature],
) -> Result<MinimalTransaction, CommitmentError> {
    let sorted = sort_signatures_by_signer_address(hash, signatures)?;
    let data = encode_call(
        EXEC_TRANSACTION_SIGNATURE,
        &[
            Token::Address(tx.to),
            Token::Uint(tx.value),
            Token::Bytes(tx.data.clone()),
            Token::Uint(U256::from(operation as u8)),
            Token::Array(
                sorted
                    .iter()
                    .map(|s| Token::Bytes(s.as_bytes().to_vec()))
                    .collect(),
            ),
        ],
    );
    Ok(MinimalTransaction {
        to: multisig,
        value: U256::zero(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout() {
        let owners = [Address([1; 20]), Address([2; 20])];
        let tx = MinimalTransaction {
            to: Address([3; 20]),
            value: U256::from(9),
            data: vec![1, 2, 3],
        };
        let encoded = encode_multisig_transaction(&owners, &tx, MultisigOperation::DelegateCall);
        assert_eq!(encoded.len(), 1 + 64 + 20 + 32 + 32 + 1);
        assert_eq!(encoded[0], 0x19);
        assert_eq!(&encoded[13..33], &[1; 20]);
        assert_eq!(&encoded[65..85], &[3; 20]);
        assert_eq!(encoded[116], 9);
        assert_eq!(*encoded.last().unwrap(), 1);
    }
}
