//! Read accessors over the permission data stored in the controlled account.

use alloc::vec::Vec;

use alloy_primitives::{Address, Bytes, B256};
use tracing::warn;

use lsp6_permission_types::{
    codec::{decode_allowed_calls, decode_allowed_data_keys},
    keys::{
        allowed_calls_key, allowed_data_keys_key, controller_index_key, decode_array_length,
        permissions_key, CONTROLLERS_LENGTH_KEY,
    },
    AllowedCall, KeyValueStore, Permissions,
};

use crate::errors::Denial;

/// Reads never cache; every call goes to the store.
pub struct PermissionRegistry<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> PermissionRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Raw value under `key`. A failed read denies rather than reading as empty.
    pub fn value_of(&self, key: B256) -> Result<Bytes, Denial> {
        self.store.get(key).map_err(|error| {
            warn!(%key, %error, "account read failed");
            Denial::AccountUnreadable { key, error }
        })
    }

    pub fn permissions_of(&self, controller: Address) -> Result<Permissions, Denial> {
        Ok(Permissions::from_value(&self.value_of(permissions_key(controller))?))
    }

    /// Raw AllowedCalls value of `controller`.
    pub fn allowed_calls_value(&self, controller: Address) -> Result<Bytes, Denial> {
        self.value_of(allowed_calls_key(controller))
    }

    pub fn allowed_calls_of(&self, controller: Address) -> Result<Vec<AllowedCall>, Denial> {
        let value = self.allowed_calls_value(controller)?;
        decode_allowed_calls(&value).map_err(|_| Denial::InvalidEncodedAllowedCalls { value })
    }

    /// Raw AllowedERC725YDataKeys value of `controller`.
    pub fn allowed_data_keys_value(&self, controller: Address) -> Result<Bytes, Denial> {
        self.value_of(allowed_data_keys_key(controller))
    }

    pub fn allowed_data_keys_of(&self, controller: Address) -> Result<Vec<Bytes>, Denial> {
        let value = self.allowed_data_keys_value(controller)?;
        decode_allowed_data_keys(&value)
            .map_err(|_| Denial::InvalidCompactedAllowedERC725YDataKeys { value })
    }

    /// Length of `AddressPermissions[]`.
    pub fn controller_count(&self) -> Result<u128, Denial> {
        let value = self.value_of(CONTROLLERS_LENGTH_KEY)?;
        decode_array_length(&value)
            .ok_or(Denial::InvalidDataValuesForDataKeys { key: CONTROLLERS_LENGTH_KEY, value })
    }

    /// `AddressPermissions[index]`, if it holds an address.
    pub fn controller_at(&self, index: u128) -> Result<Option<Address>, Denial> {
        let value = self.value_of(controller_index_key(index))?;
        Ok((value.len() == 20).then(|| Address::from_slice(&value)))
    }

    /// Every indexed controller with its permissions. Indices not holding an address are skipped.
    pub fn controllers(&self) -> Result<Vec<(Address, Permissions)>, Denial> {
        let mut controllers = Vec::new();
        for index in 0..self.controller_count()? {
            if let Some(controller) = self.controller_at(index)? {
                controllers.push((controller, self.permissions_of(controller)?));
            }
        }
        Ok(controllers)
    }
}
