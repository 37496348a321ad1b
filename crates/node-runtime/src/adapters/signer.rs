//! # Signer Adapter
//!
//! Serves `OP_SIGN` from an extended private key held in memory.

use async_trait::async_trait;
use sc_04_instruction_executor::{Instruction, InstructionOutput, Middleware, MiddlewareError};
use shared_crypto::{sign_digest, ExtendedPrivateKey};
use tracing::debug;

/// Signs digests with the child key at the requested index.
pub struct KeySigner {
    key: ExtendedPrivateKey,
}

impl KeySigner {
    /// Signer over `key`.
    pub fn new(key: ExtendedPrivateKey) -> Self {
        Self { key }
    }

    /// The xpub counterparties know this node by.
    pub fn public_identifier(&self) -> String {
        self.key.neuter().to_string()
    }
}

#[async_trait]
impl Middleware for KeySigner {
    async fn handle(&self, instruction: Instruction) -> Result<InstructionOutput, MiddlewareError> {
        let Instruction::Sign { digest, key_index } = instruction else {
            return Err(MiddlewareError::new(format!(
                "signer cannot handle {}",
                instruction.opcode()
            )));
        };
        let key = self
            .key
            .derive_signing_key(key_index)
            .map_err(MiddlewareError::new)?;
        let signature = sign_digest(&key, &digest).map_err(MiddlewareError::new)?;
        debug!(key_index, "[node] digest signed");
        Ok(InstructionOutput::Signature(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::{recover_address, xkey_kth_address};
    use shared_types::Bytes32;

    #[tokio::test]
    async fn test_signs_with_requested_child_key() {
        let signer = KeySigner::new(ExtendedPrivateKey::from_seed(&[3; 32]).unwrap());
        let digest = Bytes32([0x42; 32]);
        let out = signer
            .handle(Instruction::Sign {
                digest,
                key_index: 4,
            })
            .await
            .unwrap();
        let InstructionOutput::Signature(sig) = out else {
            panic!("expected signature");
        };
        let expected = xkey_kth_address(&signer.public_identifier(), 4).unwrap();
        assert_eq!(recover_address(&digest, &sig).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_rejects_other_opcodes() {
        let signer = KeySigner::new(ExtendedPrivateKey::from_seed(&[3; 32]).unwrap());
        let err = signer
            .handle(Instruction::PersistStateChannel { channels: vec![] })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("signer cannot handle"));
    }
}
