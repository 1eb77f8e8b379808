use alloy_primitives::{Address, Bytes, U256};

use lsp6_key_manager::relay::RelayCall;

/// A relay call before and after signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayCallEnvelope {
    /// Key manager that will execute the call; part of the signed digest.
    pub key_manager: Address,
    pub chain_id: u64,
    /// `(channel << 128) | sequence`.
    pub nonce: U256,
    /// `(start << 128) | end`; zero disables a bound.
    pub validity_timestamps: U256,
    /// Value the relayer must attach.
    pub value: U256,
    /// ERC725 payload to run on the account.
    pub payload: Bytes,

    /// `r || s || v`, empty until signed.
    pub signature: Vec<u8>,
}

impl RelayCallEnvelope {
    pub fn new(key_manager: Address, chain_id: u64, nonce: U256, payload: Bytes) -> Self {
        Self {
            key_manager,
            chain_id,
            nonce,
            validity_timestamps: U256::ZERO,
            value: U256::ZERO,
            payload,
            signature: Vec::new(),
        }
    }

    /// Only valid within `[start, end]`, in seconds. Zero leaves a side open.
    pub fn valid_between(mut self, start: u128, end: u128) -> Self {
        self.validity_timestamps = (U256::from(start) << 128usize) | U256::from(end);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// The call as the key manager receives it.
    pub fn to_relay_call(&self) -> RelayCall {
        RelayCall {
            signature: Bytes::copy_from_slice(&self.signature),
            nonce: self.nonce,
            validity_timestamps: self.validity_timestamps,
            value: self.value,
            payload: self.payload.clone(),
            chain_id: self.chain_id,
        }
    }
}
