use alloy_primitives::{Address, B256, U256};
use k256::{
    ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha3::{Digest, Keccak256};

use lsp6_key_manager::config::LSP25_VERSION;
use lsp6_permission_types::{SignatureError, SignatureScheme};

use crate::types::RelayCallEnvelope;

fn keccak256_bytes(bytes: &[u8]) -> B256 {
    let mut h = Keccak256::new();
    h.update(bytes);
    B256::from_slice(h.finalize().as_slice())
}

/// EIP-191 version 0 digest of the LSP25 message (must match the key manager's `relay_digest`).
pub fn lsp25_digest(envelope: &RelayCallEnvelope) -> B256 {
    let mut message = Vec::with_capacity(32 * 5 + envelope.payload.len());
    message.extend_from_slice(&U256::from(LSP25_VERSION).to_be_bytes::<32>());
    message.extend_from_slice(&U256::from(envelope.chain_id).to_be_bytes::<32>());
    message.extend_from_slice(&envelope.nonce.to_be_bytes::<32>());
    message.extend_from_slice(&envelope.validity_timestamps.to_be_bytes::<32>());
    message.extend_from_slice(&envelope.value.to_be_bytes::<32>());
    message.extend_from_slice(&envelope.payload);

    let mut buf = Vec::with_capacity(2 + 20 + message.len());
    buf.extend_from_slice(&[0x19, 0x00]);
    buf.extend_from_slice(envelope.key_manager.as_slice());
    buf.extend_from_slice(&message);
    keccak256_bytes(&buf)
}

/// Sign the relay digest and write the 65-byte signature into `envelope.signature`.
pub fn sign_relay_call(envelope: &mut RelayCallEnvelope, signing_key: &SigningKey) -> Result<(), k256::ecdsa::Error> {
    let digest = lsp25_digest(envelope);
    let (signature, recovery_id) = signing_key.sign_prehash_recoverable(digest.as_slice())?;

    let mut sig_bytes = Vec::with_capacity(65);
    sig_bytes.extend_from_slice(&signature.to_bytes());
    sig_bytes.push(27 + recovery_id.to_byte());
    envelope.signature = sig_bytes;
    Ok(())
}

/// Ethereum address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_slice(&keccak256_bytes(&point.as_bytes()[1..])[12..])
}

/// Off-chain [`SignatureScheme`] with the same acceptance rules as the `ecrecover` precompile
/// adapter: 65 bytes, `v` in `{0, 1, 27, 28}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct K256Recovery;

impl SignatureScheme for K256Recovery {
    fn recover_signer(&self, digest: B256, signature: &[u8]) -> Result<Address, SignatureError> {
        if signature.len() != 65 {
            return Err(SignatureError::InvalidLength(signature.len()));
        }
        let v = signature[64];
        let recovery_id = match v {
            0 | 1 => RecoveryId::from_byte(v),
            27 | 28 => RecoveryId::from_byte(v - 27),
            _ => None,
        }
        .ok_or(SignatureError::InvalidRecoveryId(v))?;

        let signature = Signature::from_slice(&signature[..64]).map_err(|_| SignatureError::Unrecoverable)?;
        let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
            .map_err(|_| SignatureError::Unrecoverable)?;
        Ok(address_of(&key))
    }
}
