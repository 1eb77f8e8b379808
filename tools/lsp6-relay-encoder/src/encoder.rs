use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use lsp6_key_manager::{
    account::interfaces::{IERC725X, IERC725Y},
    verifier::{Execution, Operation},
};
use lsp6_permission_types::{
    encode_allowed_calls, encode_allowed_data_keys,
    keys::{
        allowed_calls_key, allowed_data_keys_key, controller_index_key, permissions_key,
        CONTROLLERS_LENGTH_KEY,
    },
    AllowedCall, CodecError, Permissions,
};

/// `setData` for a single pair, `setDataBatch` otherwise.
pub fn set_data_payload(keys: Vec<B256>, values: Vec<Bytes>) -> Bytes {
    if keys.len() == 1 && values.len() == 1 {
        let call = IERC725Y::setDataCall { dataKey: keys[0], dataValue: values[0].clone() };
        return call.abi_encode().into();
    }
    IERC725Y::setDataBatchCall { dataKeys: keys, dataValues: values }.abi_encode().into()
}

pub fn execute_payload(operation: Operation, target: Address, value: U256, data: Bytes) -> Bytes {
    IERC725X::executeCall { operationType: operation.into(), target, value, data }.abi_encode().into()
}

pub fn execute_batch_payload(executions: &[Execution]) -> Bytes {
    IERC725X::executeBatchCall {
        operationsType: executions.iter().map(|e| <U256 as From<Operation>>::from(e.operation)).collect(),
        targets: executions.iter().map(|e| e.target).collect(),
        values: executions.iter().map(|e| e.value).collect(),
        datas: executions.iter().map(|e| e.data.clone()).collect(),
    }
    .abi_encode()
    .into()
}

/// Permission data for one controller, written as a single `setData` batch.
#[derive(Clone, Debug)]
pub struct ControllerGrant {
    pub controller: Address,
    pub permissions: Permissions,
    pub allowed_calls: Vec<AllowedCall>,
    pub allowed_data_keys: Vec<Bytes>,
}

impl ControllerGrant {
    pub fn new(controller: Address, permissions: Permissions) -> Self {
        Self { controller, permissions, allowed_calls: Vec::new(), allowed_data_keys: Vec::new() }
    }

    pub fn with_allowed_calls(mut self, entries: &[AllowedCall]) -> Self {
        self.allowed_calls = entries.to_vec();
        self
    }

    pub fn with_allowed_data_keys(mut self, prefixes: &[Bytes]) -> Self {
        self.allowed_data_keys = prefixes.to_vec();
        self
    }

    /// Keys and values to write. With `append_at = Some(length)` the controller is also pushed
    /// onto `AddressPermissions[]`, whose current length is `length`.
    pub fn data_pairs(&self, append_at: Option<u128>) -> Result<(Vec<B256>, Vec<Bytes>), CodecError> {
        let mut keys = vec![permissions_key(self.controller)];
        let mut values = vec![Bytes::copy_from_slice(self.permissions.to_b256().as_slice())];

        if !self.allowed_calls.is_empty() {
            keys.push(allowed_calls_key(self.controller));
            values.push(encode_allowed_calls(&self.allowed_calls)?);
        }
        if !self.allowed_data_keys.is_empty() {
            keys.push(allowed_data_keys_key(self.controller));
            values.push(encode_allowed_data_keys(&self.allowed_data_keys)?);
        }
        if let Some(length) = append_at {
            keys.push(CONTROLLERS_LENGTH_KEY);
            values.push(Bytes::copy_from_slice(&(length + 1).to_be_bytes()));
            keys.push(controller_index_key(length));
            values.push(Bytes::copy_from_slice(self.controller.as_slice()));
        }
        Ok((keys, values))
    }

    pub fn set_data_payload(&self, append_at: Option<u128>) -> Result<Bytes, CodecError> {
        let (keys, values) = self.data_pairs(append_at)?;
        Ok(set_data_payload(keys, values))
    }
}
