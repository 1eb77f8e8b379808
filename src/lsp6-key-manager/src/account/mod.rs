//! The controlled ERC725 account as seen by the key manager.

pub mod interfaces;
#[cfg(feature = "contract")]
pub mod onchain;

use lsp6_permission_types::{InterfaceProbe, KeyValueStore, OwnershipView};

/// Everything the verifier reads from the account and its surroundings.
pub trait Account: KeyValueStore + InterfaceProbe + OwnershipView {}

impl<T: KeyValueStore + InterfaceProbe + OwnershipView + ?Sized> Account for T {}
