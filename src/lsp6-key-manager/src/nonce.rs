//! Per-controller, per-channel replay protection for relayed calls.
//!
//! A nonce is `(channel << 128) | sequence`. Each `(controller, channel)` pair has its own
//! sequence, so independent channels can be consumed out of order relative to each other.

use alloc::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use tracing::trace;

use crate::{config::MAX_CHANNEL, errors::Denial};

/// Backing storage for the next expected sequence of each channel.
pub trait NonceStore {
    fn load(&self, controller: Address, channel: u128) -> u128;
    fn store(&mut self, controller: Address, channel: u128, sequence: u128);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNonceStore(BTreeMap<(Address, u128), u128>);

impl NonceStore for MemoryNonceStore {
    fn load(&self, controller: Address, channel: u128) -> u128 {
        self.0.get(&(controller, channel)).copied().unwrap_or(0)
    }

    fn store(&mut self, controller: Address, channel: u128, sequence: u128) {
        self.0.insert((controller, channel), sequence);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NonceError {
    #[error("expected sequence {expected}, got {presented}")]
    Mismatch { expected: u128, presented: u128 },
    #[error("channel {channel} has no sequences left")]
    ChannelExhausted { channel: u128 },
}

/// Split a full nonce into `(channel, sequence)`.
pub fn split(nonce: U256) -> (u128, u128) {
    let channel: u128 = (nonce >> 128usize).to();
    let sequence: u128 = (nonce & U256::from(u128::MAX)).to();
    (channel, sequence)
}

/// Join `(channel, sequence)` into a full nonce.
pub fn join(channel: u128, sequence: u128) -> U256 {
    (U256::from(channel) << 128usize) | U256::from(sequence)
}

#[derive(Debug, Default)]
pub struct NonceManager<S> {
    store: S,
}

impl<S: NonceStore> NonceManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn next_expected(&self, controller: Address, channel: u128) -> u128 {
        self.store.load(controller, channel)
    }

    /// Accept `presented` only if it is exactly the next expected sequence, then advance.
    /// A rejected nonce leaves the channel untouched.
    pub fn consume(&mut self, controller: Address, channel: u128, presented: u128) -> Result<(), NonceError> {
        let expected = self.store.load(controller, channel);
        if presented != expected {
            return Err(NonceError::Mismatch { expected, presented });
        }
        let next = expected.checked_add(1).ok_or(NonceError::ChannelExhausted { channel })?;
        self.store.store(controller, channel, next);
        trace!(%controller, channel, sequence = presented, "nonce consumed");
        Ok(())
    }

    /// The full nonce the next relay call from `controller` on `channel` must carry.
    pub fn get_nonce(&self, controller: Address, channel: U256) -> Result<U256, Denial> {
        if channel > U256::from(MAX_CHANNEL) {
            return Err(Denial::ChannelOutOfRange { channel });
        }
        let channel: u128 = channel.to();
        Ok(join(channel, self.next_expected(controller, channel)))
    }
}
