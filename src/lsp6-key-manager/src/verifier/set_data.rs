use alloc::vec::Vec;

use alloy_primitives::{Address, Bytes, B256};
use tracing::{debug, warn};

use lsp6_permission_types::{
    codec::{decode_allowed_calls, decode_allowed_data_keys},
    keys::{classify, decode_array_length, DataKeyKind, PermissionKey, CONTROLLERS_LENGTH_VALUE_LEN},
    Permissions,
};

use super::{require, PermissionVerifier};
use crate::{account::Account, errors::Denial};

/// Either the "add" or the "change" permission, by whether something is stored already.
fn add_or_change(stored_is_empty: bool, add: Permissions, change: Permissions) -> Permissions {
    if stored_is_empty {
        add
    } else {
        change
    }
}

impl<A: Account + ?Sized> PermissionVerifier<'_, A> {
    /// Authorize writing `values` under `keys`. Duplicate keys are allowed; every pair is
    /// checked against the state before the batch.
    pub fn verify_set_data(
        &self,
        controller: Address,
        keys: &[B256],
        values: &[Bytes],
    ) -> Result<(), Denial> {
        let verdict = self.check_set_data(controller, keys, values);
        match &verdict {
            Ok(()) => debug!(%controller, keys = keys.len(), "setData authorized"),
            Err(reason) => warn!(%controller, %reason, "setData denied"),
        }
        verdict
    }

    fn check_set_data(
        &self,
        controller: Address,
        keys: &[B256],
        values: &[Bytes],
    ) -> Result<(), Denial> {
        if keys.len() != values.len() {
            return Err(Denial::ParametersLengthMismatch);
        }
        if keys.is_empty() {
            return Err(Denial::EmptyArray);
        }

        let permissions = self.permissions_of(controller)?;
        let kinds: Vec<DataKeyKind> = keys.iter().map(classify).collect();

        let has_admin = kinds.iter().any(DataKeyKind::is_permission_admin);
        let has_regular = kinds.iter().any(|kind| *kind == DataKeyKind::Regular);
        if has_admin
            && has_regular
            && permissions.has(Permissions::SETDATA)
            && !permissions.intersects(Permissions::ADDPERMISSIONS | Permissions::CHANGEPERMISSIONS)
        {
            return Err(Denial::NoERC725YDataKeysAllowed { controller });
        }

        // decoded on first use
        let mut allowed_keys: Option<Vec<Bytes>> = None;

        for ((key, value), kind) in keys.iter().zip(values).zip(kinds) {
            match kind {
                DataKeyKind::Permission(permission_key) => {
                    let required = self.permission_key_requirement(*key, permission_key, value)?;
                    require(controller, permissions, required)?;
                }
                DataKeyKind::UniversalReceiverDelegate => {
                    let required = add_or_change(
                        self.registry().value_of(*key)?.is_empty(),
                        Permissions::ADDUNIVERSALRECEIVERDELEGATE,
                        Permissions::CHANGEUNIVERSALRECEIVERDELEGATE,
                    );
                    require(controller, permissions, required)?;
                }
                DataKeyKind::Extension => {
                    let required = add_or_change(
                        self.registry().value_of(*key)?.is_empty(),
                        Permissions::ADDEXTENSIONS,
                        Permissions::CHANGEEXTENSIONS,
                    );
                    require(controller, permissions, required)?;
                }
                DataKeyKind::Regular => {
                    self.verify_regular_key(controller, permissions, *key, &mut allowed_keys)?;
                }
            }
        }
        Ok(())
    }

    /// Permission needed to write `value` under a key of the `AddressPermissions` family.
    fn permission_key_requirement(
        &self,
        key: B256,
        permission_key: PermissionKey,
        value: &Bytes,
    ) -> Result<Permissions, Denial> {
        let add = Permissions::ADDPERMISSIONS;
        let change = Permissions::CHANGEPERMISSIONS;

        let required = match permission_key {
            PermissionKey::Permissions(_) => {
                let stored = self.registry().value_of(key)?;
                add_or_change(Permissions::from_value(&stored).is_empty(), add, change)
            }
            PermissionKey::AllowedCalls(_) => {
                decode_allowed_calls(value)
                    .map_err(|_| Denial::InvalidEncodedAllowedCalls { value: value.clone() })?;
                add_or_change(self.registry().value_of(key)?.is_empty(), add, change)
            }
            PermissionKey::AllowedDataKeys(_) => {
                decode_allowed_data_keys(value).map_err(|_| {
                    Denial::InvalidCompactedAllowedERC725YDataKeys { value: value.clone() }
                })?;
                add_or_change(self.registry().value_of(key)?.is_empty(), add, change)
            }
            PermissionKey::ControllersLength => {
                if !value.is_empty() && value.len() != CONTROLLERS_LENGTH_VALUE_LEN {
                    return Err(Denial::InvalidDataValuesForDataKeys { key, value: value.clone() });
                }
                let new_length = decode_array_length(value).unwrap_or(0);
                let current_length = decode_array_length(&self.registry().value_of(key)?).unwrap_or(0);
                if new_length > current_length {
                    add
                } else {
                    change
                }
            }
            PermissionKey::ControllerAt(_) => {
                if !value.is_empty() && value.len() != Address::len_bytes() {
                    return Err(Denial::ArrayIndexValueNotAnAddress { key, value: value.clone() });
                }
                // writing into an unused slot adds; overwriting or clearing changes
                let stored = self.registry().value_of(key)?;
                if stored.is_empty() && !value.is_empty() {
                    add
                } else {
                    change
                }
            }
            PermissionKey::Unrecognised => return Err(Denial::NotRecognisedPermissionKey { key }),
        };
        Ok(required)
    }

    fn verify_regular_key(
        &self,
        controller: Address,
        permissions: Permissions,
        key: B256,
        allowed_keys: &mut Option<Vec<Bytes>>,
    ) -> Result<(), Denial> {
        if permissions.has(Permissions::SUPER_SETDATA) {
            return Ok(());
        }
        require(controller, permissions, Permissions::SETDATA)?;

        if allowed_keys.is_none() {
            *allowed_keys = Some(self.registry().allowed_data_keys_of(controller)?);
        }
        let prefixes = allowed_keys.as_deref().unwrap_or_default();
        if prefixes.is_empty() || prefixes.iter().any(|prefix| key.as_slice().starts_with(prefix)) {
            return Ok(());
        }
        Err(Denial::NotAllowedERC725YKey { controller, key })
    }
}
