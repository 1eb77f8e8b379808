//! Permission, data-key and allow-list types shared by the LSP6 key manager contract and
//! its off-chain tooling.

extern crate alloc;

pub mod calls;
pub mod codec;
pub mod interfaces;
pub mod keys;
pub mod memory;
pub mod permissions;

pub use calls::{selector_of, AllowedCall, CallTypes, ALLOWED_CALL_LEN};
pub use codec::{
    decode_allowed_calls, decode_allowed_data_keys, encode_allowed_calls, encode_allowed_data_keys,
    CodecError,
};
pub use interfaces::{
    InterfaceProbe, KeyValueStore, OwnershipView, SignatureError, SignatureScheme, StoreError,
};
pub use keys::{classify, DataKeyKind, PermissionKey};
pub use memory::MemoryAccount;
pub use permissions::Permissions;
