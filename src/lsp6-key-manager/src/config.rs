use alloy_primitives::Address;

/// LSP25 version tag, the first word of every relay message.
pub const LSP25_VERSION: u64 = 25;

/// Highest nonce channel (`nonce >> 128` must fit in 128 bits).
pub const MAX_CHANNEL: u128 = u128::MAX;

/// Static call gas cap for reads into the controlled account and interface probes.
pub const STATICCALL_GAS: u64 = 100_000;

/// Addresses and chain the engine is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// The controlled ERC725 account.
    pub account: Address,
    /// The key manager itself. Relay signatures are domain-separated with it and calls
    /// targeting it through the account are rejected.
    pub key_manager: Address,
    pub chain_id: u64,
}

impl EngineConfig {
    pub fn new(account: Address, key_manager: Address, chain_id: u64) -> Self {
        Self { account, key_manager, chain_id }
    }
}
