//! Stylus `KeyManager` contract.
//!
//! Thin adapter over [`KeyManagerEngine`]: the controlled account is read through static
//! calls, nonces and the reentrancy flag live in contract storage, and authorized payloads are
//! forwarded to the account with the attached value. Denials revert with their Solidity
//! custom error; reverts of the forwarded call bubble up unchanged.

use alloc::vec::Vec;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::sol;
use stylus_sdk::{
    abi::Bytes as AbiBytes,
    call::RawCall,
    prelude::*,
    storage::{StorageBool, StorageMap, StorageU256},
    stylus_proc::SolidityError,
};

use crate::{
    account::onchain::OnchainAccount,
    config::{EngineConfig, MAX_CHANNEL, STATICCALL_GAS},
    engine::{ActionExecutor, AuthorizedCall, KeyManagerEngine},
    errors::{Denial, KeyManagerError},
    nonce::{join, NonceStore},
    reentrancy::{GuardState, ReentrancyGuard},
    relay::RelayCall,
    utils::crypto::EcrecoverPrecompile,
};

sol! {
    error AlreadyInitialized(address target);
    error NotInitialized();
}

#[derive(SolidityError)]
pub enum ModuleError {
    AlreadyInitialized(AlreadyInitialized),
    NotInitialized(NotInitialized),
}

sol_storage! {
    #[entrypoint]
    pub struct KeyManager {
        /// The controlled ERC725 account.
        address target;

        /// Next expected sequence per (controller, channel).
        mapping(address => mapping(uint256 => uint256)) nonce_store;

        /// Set while a forwarded call is in flight.
        bool reentrancy_status;
    }
}

type NonceMap = StorageMap<Address, StorageMap<U256, StorageU256>>;

/// Nonce sequences kept in contract storage.
struct StorageNonces<'a>(&'a mut NonceMap);

impl NonceStore for StorageNonces<'_> {
    fn load(&self, controller: Address, channel: u128) -> u128 {
        self.0.getter(controller).get(U256::from(channel)).saturating_to()
    }

    fn store(&mut self, controller: Address, channel: u128, sequence: u128) {
        self.0.setter(controller).insert(U256::from(channel), U256::from(sequence));
    }
}

/// Forwards authorized payloads to the account, raising the stored reentrancy flag for the
/// duration of the outermost call. The storage cache is flushed and dropped before the call,
/// so the flag is visible to a nested invocation and its writes are re-read afterwards.
struct ForwardCall<'a> {
    account: Address,
    status: &'a mut StorageBool,
}

impl ActionExecutor for ForwardCall<'_> {
    fn perform(&mut self, call: &AuthorizedCall) -> Result<Bytes, Bytes> {
        let outermost = !self.status.get();
        if outermost {
            self.status.set(true);
        }
        let result = unsafe {
            RawCall::new_with_value(call.value)
                .clear_storage_cache()
                .call(self.account, &call.payload)
        };
        if outermost {
            self.status.set(false);
        }
        result.map(Bytes::from).map_err(Bytes::from)
    }
}

type OnchainEngine<'a> = KeyManagerEngine<OnchainAccount, StorageNonces<'a>, EcrecoverPrecompile>;

#[public]
impl KeyManager {
    /// Bind the key manager to the account it controls. Can only be done once.
    pub fn initialize(&mut self, target: Address) -> Result<(), Vec<u8>> {
        let current = self.target.get();
        if current != Address::ZERO {
            return Err(ModuleError::AlreadyInitialized(AlreadyInitialized { target: current }).into());
        }
        self.target.set(target);
        Ok(())
    }

    pub fn target(&self) -> Address {
        self.target.get()
    }

    /// The nonce the next relay call of `from` on `channel` must carry.
    pub fn get_nonce(&self, from: Address, channel: U256) -> Result<U256, Vec<u8>> {
        if channel > U256::from(MAX_CHANNEL) {
            return Err(Denial::ChannelOutOfRange { channel }.revert_data());
        }
        let sequence: u128 = self.nonce_store.getter(from).get(channel).saturating_to();
        Ok(join(channel.to(), sequence))
    }

    #[payable]
    pub fn execute(&mut self, payload: AbiBytes) -> Result<AbiBytes, Vec<u8>> {
        let caller = self.vm().msg_sender();
        let value = self.vm().msg_value();
        let output = self.run(|engine, forward| engine.execute(caller, &payload, value, forward))?;
        Ok(output.to_vec().into())
    }

    #[payable]
    pub fn execute_batch(&mut self, values: Vec<U256>, payloads: Vec<AbiBytes>) -> Result<Vec<AbiBytes>, Vec<u8>> {
        let caller = self.vm().msg_sender();
        let value_sent = self.vm().msg_value();
        let payloads: Vec<Bytes> = payloads.into_iter().map(|payload| Bytes::from(payload.0)).collect();
        let outputs = self.run(|engine, forward| engine.execute_batch(caller, &values, &payloads, value_sent, forward))?;
        Ok(outputs.into_iter().map(|output| output.to_vec().into()).collect())
    }

    /// Unlike the in-memory engine, a denial here reverts the whole transaction, the nonce
    /// consumption included.
    #[payable]
    pub fn execute_relay_call(
        &mut self,
        signature: AbiBytes,
        nonce: U256,
        validity_timestamps: U256,
        payload: AbiBytes,
    ) -> Result<AbiBytes, Vec<u8>> {
        let call = RelayCall {
            signature: Bytes::from(signature.0),
            nonce,
            validity_timestamps,
            value: self.vm().msg_value(),
            payload: Bytes::from(payload.0),
            chain_id: self.vm().chain_id(),
        };
        let now = self.vm().block_timestamp();
        let output = self.run(|engine, forward| engine.relay_execute(&call, now, forward))?;
        Ok(output.to_vec().into())
    }

    #[payable]
    pub fn execute_relay_call_batch(
        &mut self,
        signatures: Vec<AbiBytes>,
        nonces: Vec<U256>,
        validity_timestamps: Vec<U256>,
        values: Vec<U256>,
        payloads: Vec<AbiBytes>,
    ) -> Result<Vec<AbiBytes>, Vec<u8>> {
        let signatures: Vec<Bytes> = signatures.into_iter().map(|signature| Bytes::from(signature.0)).collect();
        let payloads: Vec<Bytes> = payloads.into_iter().map(|payload| Bytes::from(payload.0)).collect();
        let calls = RelayCall::batch(&signatures, &nonces, &validity_timestamps, &values, &payloads, self.vm().chain_id())
            .map_err(|denial| denial.revert_data())?;

        let value_sent = self.vm().msg_value();
        let now = self.vm().block_timestamp();
        let outputs = self.run(|engine, forward| engine.relay_execute_batch(&calls, value_sent, now, forward))?;
        Ok(outputs.into_iter().map(|output| output.to_vec().into()).collect())
    }
}

impl KeyManager {
    /// Assemble the engine over this contract's storage and run `action` with it.
    fn run<R>(
        &mut self,
        action: impl FnOnce(&OnchainEngine<'_>, &mut ForwardCall<'_>) -> Result<R, KeyManagerError>,
    ) -> Result<R, Vec<u8>> {
        let account = self.target.get();
        if account == Address::ZERO {
            return Err(ModuleError::NotInitialized(NotInitialized {}).into());
        }
        let config = EngineConfig::new(account, self.vm().contract_address(), self.vm().chain_id());

        // A set flag means this invocation is nested inside a forwarded call.
        let guard = if self.reentrancy_status.get() {
            ReentrancyGuard::with_state(GuardState::Active(Address::ZERO))
        } else {
            ReentrancyGuard::new()
        };

        let engine = KeyManagerEngine::new(
            config,
            OnchainAccount::new(account, STATICCALL_GAS),
            StorageNonces(&mut self.nonce_store),
            EcrecoverPrecompile,
        )
        .with_guard(guard);
        let mut forward = ForwardCall { account, status: &mut self.reentrancy_status };

        action(&engine, &mut forward).map_err(|err| err.revert_data())
    }
}
