//! ERC725Y data keys the key manager interprets.
//!
//! The account store is schema-less; these shapes are recognised by convention only.

use alloy_primitives::{b256, Address, B256};

/// `AddressPermissions` namespace (first 6 bytes of every `AddressPermissions:*:<address>` key).
pub const ADDRESS_PERMISSIONS_PREFIX: [u8; 6] = [0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf];

/// `AddressPermissions:Permissions:<address>`
pub const PERMISSIONS_PREFIX: [u8; 12] =
    [0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf, 0x82, 0xac, 0xb3, 0x63, 0x00, 0x00];

/// `AddressPermissions:AllowedCalls:<address>`
pub const ALLOWED_CALLS_PREFIX: [u8; 12] =
    [0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf, 0x39, 0x3a, 0x64, 0xc7, 0x00, 0x00];

/// `AddressPermissions:AllowedERC725YDataKeys:<address>`
pub const ALLOWED_DATA_KEYS_PREFIX: [u8; 12] =
    [0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf, 0x86, 0x6c, 0x29, 0x11, 0x00, 0x00];

/// `keccak256('AddressPermissions[]')`, holding the controller count as `uint128`.
pub const CONTROLLERS_LENGTH_KEY: B256 =
    b256!("df30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3");

/// First 16 bytes of [`CONTROLLERS_LENGTH_KEY`]; followed by a `uint128` index.
pub const CONTROLLERS_INDEX_PREFIX: [u8; 16] = [
    0xdf, 0x30, 0xdb, 0xa0, 0x6d, 0xb6, 0xa3, 0x0e, 0x65, 0x35, 0x4d, 0x9a, 0x64, 0xc6, 0x09, 0x86,
];

/// `keccak256('LSP1UniversalReceiverDelegate')`
pub const UNIVERSAL_RECEIVER_DELEGATE_KEY: B256 =
    b256!("0cfc51aec37c55a4d0b1a65c6255c4bf2fbdf6277f3cc0730c45b828b6db8b47");

/// `LSP1UniversalReceiverDelegate:<bytes32>` mapping prefix.
pub const UNIVERSAL_RECEIVER_DELEGATE_PREFIX: [u8; 12] =
    [0x0c, 0xfc, 0x51, 0xae, 0xc3, 0x7c, 0x55, 0xa4, 0xd0, 0xb1, 0x00, 0x00];

/// `LSP17Extension:<bytes4>` mapping prefix.
pub const EXTENSION_PREFIX: [u8; 12] =
    [0xce, 0xe7, 0x8b, 0x40, 0x94, 0xda, 0x86, 0x01, 0x10, 0x96, 0x00, 0x00];

/// Byte width of the `uint128` controller count value.
pub const CONTROLLERS_LENGTH_VALUE_LEN: usize = 16;

fn mapping_key(prefix: &[u8; 12], address: Address) -> B256 {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(prefix);
    key[12..].copy_from_slice(address.as_slice());
    B256::from(key)
}

pub fn permissions_key(controller: Address) -> B256 {
    mapping_key(&PERMISSIONS_PREFIX, controller)
}

pub fn allowed_calls_key(controller: Address) -> B256 {
    mapping_key(&ALLOWED_CALLS_PREFIX, controller)
}

pub fn allowed_data_keys_key(controller: Address) -> B256 {
    mapping_key(&ALLOWED_DATA_KEYS_PREFIX, controller)
}

/// `AddressPermissions[index]`
pub fn controller_index_key(index: u128) -> B256 {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&CONTROLLERS_INDEX_PREFIX);
    key[16..].copy_from_slice(&index.to_be_bytes());
    B256::from(key)
}

/// `LSP17Extension:<selector>` (selector right-padded to 20 bytes).
pub fn extension_key(selector: [u8; 4]) -> B256 {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(&EXTENSION_PREFIX);
    key[12..16].copy_from_slice(&selector);
    B256::from(key)
}

/// Decode the `AddressPermissions[]` length value.
///
/// An empty value is a zero length; anything other than 16 bytes is not a valid `uint128`.
pub fn decode_array_length(value: &[u8]) -> Option<u128> {
    if value.is_empty() {
        return Some(0);
    }
    let word: [u8; CONTROLLERS_LENGTH_VALUE_LEN] = value.try_into().ok()?;
    Some(u128::from_be_bytes(word))
}

/// Keys in the permission-administration namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionKey {
    Permissions(Address),
    AllowedCalls(Address),
    AllowedDataKeys(Address),
    ControllersLength,
    ControllerAt(u128),
    /// Shares the `AddressPermissions` prefix but matches no known shape.
    Unrecognised,
}

/// How a data key is authorized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKeyKind {
    Permission(PermissionKey),
    UniversalReceiverDelegate,
    Extension,
    Regular,
}

impl DataKeyKind {
    pub fn is_permission_admin(&self) -> bool {
        matches!(self, DataKeyKind::Permission(_))
    }
}

/// Classify a data key by shape.
pub fn classify(key: &B256) -> DataKeyKind {
    let bytes = key.as_slice();

    if bytes.starts_with(&ADDRESS_PERMISSIONS_PREFIX) {
        let controller = Address::from_slice(&bytes[12..]);
        let kind = if bytes.starts_with(&PERMISSIONS_PREFIX) {
            PermissionKey::Permissions(controller)
        } else if bytes.starts_with(&ALLOWED_CALLS_PREFIX) {
            PermissionKey::AllowedCalls(controller)
        } else if bytes.starts_with(&ALLOWED_DATA_KEYS_PREFIX) {
            PermissionKey::AllowedDataKeys(controller)
        } else {
            PermissionKey::Unrecognised
        };
        return DataKeyKind::Permission(kind);
    }

    // the length key shares its first 16 bytes with the index keys
    if *key == CONTROLLERS_LENGTH_KEY {
        return DataKeyKind::Permission(PermissionKey::ControllersLength);
    }
    if bytes.starts_with(&CONTROLLERS_INDEX_PREFIX) {
        let mut index = [0u8; 16];
        index.copy_from_slice(&bytes[16..]);
        return DataKeyKind::Permission(PermissionKey::ControllerAt(u128::from_be_bytes(index)));
    }

    if *key == UNIVERSAL_RECEIVER_DELEGATE_KEY || bytes.starts_with(&UNIVERSAL_RECEIVER_DELEGATE_PREFIX) {
        return DataKeyKind::UniversalReceiverDelegate;
    }
    if bytes.starts_with(&EXTENSION_PREFIX) {
        return DataKeyKind::Extension;
    }

    DataKeyKind::Regular
}
