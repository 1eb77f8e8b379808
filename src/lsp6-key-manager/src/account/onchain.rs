use alloc::vec::Vec;

use alloy_primitives::{Address, Bytes, FixedBytes, B256};
use alloy_sol_types::SolCall;
use stylus_sdk::call::RawCall;

use lsp6_permission_types::{InterfaceProbe, KeyValueStore, OwnershipView, StoreError};

use super::interfaces::{IERC165, IERC725Y, ILSP14Ownable2Step};

/// The controlled account, reached through `staticcall`s with a per-call gas cap.
pub struct OnchainAccount {
    pub account: Address,
    pub gas_cap: u64,
}

impl OnchainAccount {
    pub fn new(account: Address, gas_cap: u64) -> Self {
        Self { account, gas_cap }
    }

    fn staticcall(&self, target: Address, data: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
        unsafe { RawCall::new_static().gas(self.gas_cap).call(target, data) }
    }
}

impl KeyValueStore for OnchainAccount {
    fn get(&self, key: B256) -> Result<Bytes, StoreError> {
        let call = IERC725Y::getDataCall { dataKey: key };
        let out = self
            .staticcall(self.account, &call.abi_encode())
            .map_err(|revert| StoreError::CallFailed(revert.into()))?;
        IERC725Y::getDataCall::abi_decode_returns(&out, true)
            .map(|ret| ret.dataValue)
            .map_err(|_| StoreError::MalformedReturn)
    }
}

impl InterfaceProbe for OnchainAccount {
    fn supports(&self, target: Address, standard: FixedBytes<4>) -> bool {
        let call = IERC165::supportsInterfaceCall { interfaceId: standard };
        self.staticcall(target, &call.abi_encode())
            .ok()
            .and_then(|out| IERC165::supportsInterfaceCall::abi_decode_returns(&out, true).ok())
            .map(|ret| ret.supported)
            .unwrap_or(false)
    }
}

impl OwnershipView for OnchainAccount {
    fn pending_owner(&self) -> Address {
        let call = ILSP14Ownable2Step::pendingOwnerCall {};
        self.staticcall(self.account, &call.abi_encode())
            .ok()
            .and_then(|out| ILSP14Ownable2Step::pendingOwnerCall::abi_decode_returns(&out, true).ok())
            .map(|ret| ret.pending)
            .unwrap_or(Address::ZERO)
    }
}
