//! LSP6 Key Manager.
//!
//! Decides whether a controller may act on an ERC725 account: direct `execute` payloads,
//! LSP25 relayed calls signed off-chain, and the permission-administration writes that change
//! who may do what. Storage of the account and the forwarded call itself stay external; this
//! crate only authorizes.
//!
//! With the `contract` feature (default) the same engine is exposed as a Stylus contract.

#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]

extern crate alloc;

pub mod account;
pub mod config;
pub mod engine;
pub mod errors;
pub mod nonce;
pub mod reentrancy;
pub mod registry;
pub mod relay;
pub mod utils;
pub mod verifier;

#[cfg(feature = "contract")]
mod key_manager;

#[cfg(feature = "contract")]
pub use key_manager::KeyManager;

pub use config::EngineConfig;
pub use engine::{ActionExecutor, AuthorizedCall, KeyManagerEngine};
pub use errors::{Denial, KeyManagerError};
pub use lsp6_permission_types as types;
