use alloc::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, Bytes, FixedBytes, B256};

use crate::{
    calls::AllowedCall,
    codec::{encode_allowed_calls, encode_allowed_data_keys, CodecError},
    interfaces::{InterfaceProbe, KeyValueStore, OwnershipView, StoreError},
    keys::{
        allowed_calls_key, allowed_data_keys_key, controller_index_key, decode_array_length,
        permissions_key, CONTROLLERS_LENGTH_KEY,
    },
    permissions::Permissions,
};

/// In-memory account for tests and off-chain simulation.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccount {
    data: BTreeMap<B256, Bytes>,
    interfaces: BTreeSet<(Address, FixedBytes<4>)>,
    pending_owner: Address,
}

impl MemoryAccount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_permissions(&mut self, controller: Address, permissions: Permissions) -> &mut Self {
        self.set(permissions_key(controller), Bytes::copy_from_slice(permissions.to_b256().as_slice()));
        self
    }

    pub fn set_allowed_calls(
        &mut self,
        controller: Address,
        entries: &[AllowedCall],
    ) -> Result<&mut Self, CodecError> {
        self.set(allowed_calls_key(controller), encode_allowed_calls(entries)?);
        Ok(self)
    }

    pub fn set_allowed_data_keys(
        &mut self,
        controller: Address,
        prefixes: &[Bytes],
    ) -> Result<&mut Self, CodecError> {
        self.set(allowed_data_keys_key(controller), encode_allowed_data_keys(prefixes)?);
        Ok(self)
    }

    /// Append `controller` to `AddressPermissions[]` and bump the length.
    pub fn push_controller(&mut self, controller: Address) -> &mut Self {
        let length = decode_array_length(&self.value(CONTROLLERS_LENGTH_KEY)).unwrap_or(0);
        self.set(controller_index_key(length), Bytes::copy_from_slice(controller.as_slice()));
        self.set(CONTROLLERS_LENGTH_KEY, Bytes::copy_from_slice(&(length + 1).to_be_bytes()));
        self
    }

    /// Stored value, empty when absent.
    pub fn value(&self, key: B256) -> Bytes {
        self.data.get(&key).cloned().unwrap_or_default()
    }

    /// Writing an empty value clears the key.
    pub fn set(&mut self, key: B256, value: Bytes) {
        if value.is_empty() {
            self.data.remove(&key);
        } else {
            self.data.insert(key, value);
        }
    }

    /// Pairwise `set`, as `setDataBatch` would apply it.
    pub fn set_many(&mut self, keys: &[B256], values: &[Bytes]) {
        for (key, value) in keys.iter().zip(values) {
            self.set(*key, value.clone());
        }
    }

    pub fn add_interface(&mut self, target: Address, standard: FixedBytes<4>) -> &mut Self {
        self.interfaces.insert((target, standard));
        self
    }

    pub fn set_pending_owner(&mut self, pending: Address) -> &mut Self {
        self.pending_owner = pending;
        self
    }
}

impl KeyValueStore for MemoryAccount {
    fn get(&self, key: B256) -> Result<Bytes, StoreError> {
        Ok(self.value(key))
    }
}

impl InterfaceProbe for MemoryAccount {
    fn supports(&self, target: Address, standard: FixedBytes<4>) -> bool {
        self.interfaces.contains(&(target, standard))
    }
}

impl OwnershipView for MemoryAccount {
    fn pending_owner(&self) -> Address {
        self.pending_owner
    }
}
