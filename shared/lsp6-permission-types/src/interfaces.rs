use alloy_primitives::{hex, Address, Bytes, FixedBytes, B256};

/// Key/value store of the controlled account (ERC725Y), read side.
pub trait KeyValueStore {
    /// Stored value, empty when absent. `Err` when the store could not be read at all, which
    /// must never be taken for an empty value.
    fn get(&self, key: B256) -> Result<Bytes, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The read reverted; carries the revert data.
    #[error("getData reverted: 0x{}", hex::encode(.0))]
    CallFailed(Bytes),
    #[error("malformed getData return")]
    MalformedReturn,
}

/// ERC165 interface detection on arbitrary targets.
pub trait InterfaceProbe {
    fn supports(&self, target: Address, standard: FixedBytes<4>) -> bool;
}

/// Two-step ownership state of the controlled account (LSP14).
pub trait OwnershipView {
    fn pending_owner(&self) -> Address;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be 65 bytes, got {0}")]
    InvalidLength(usize),
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signer could not be recovered")]
    Unrecoverable,
}

/// Recovers the address that signed a 32-byte digest.
pub trait SignatureScheme {
    fn recover_signer(&self, digest: B256, signature: &[u8]) -> Result<Address, SignatureError>;
}
