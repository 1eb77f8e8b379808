//! LSP25 relay message and its EIP-191 "intended validator" digest.

use alloc::vec::Vec;

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::config::LSP25_VERSION;

/// `abi.encodePacked(uint256 25, uint256 chainId, uint256 nonce, uint256 validityTimestamps,
/// uint256 value, bytes payload)`.
pub fn lsp25_message(chain_id: u64, nonce: U256, validity_timestamps: U256, value: U256, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(32 * 5 + payload.len());
    message.extend_from_slice(&U256::from(LSP25_VERSION).to_be_bytes::<32>());
    message.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    message.extend_from_slice(&nonce.to_be_bytes::<32>());
    message.extend_from_slice(&validity_timestamps.to_be_bytes::<32>());
    message.extend_from_slice(&value.to_be_bytes::<32>());
    message.extend_from_slice(payload);
    message
}

/// `keccak256(0x19 || 0x00 || key_manager || message)`.
///
/// Binding the key manager address means a signature for one key manager is useless on another.
pub fn relay_digest(key_manager: Address, message: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(2 + 20 + message.len());
    buf.extend_from_slice(&[0x19, 0x00]);
    buf.extend_from_slice(key_manager.as_slice());
    buf.extend_from_slice(message);
    keccak256(buf)
}

/// Split validity timestamps into `(start, end)`; `0` disables either bound.
pub fn validity_window(validity_timestamps: U256) -> (u128, u128) {
    crate::nonce::split(validity_timestamps)
}
