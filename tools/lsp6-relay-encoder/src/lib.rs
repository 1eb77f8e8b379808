//! Off-chain side of the LSP6 key manager: builds the payloads controllers submit and signs
//! LSP25 relay calls.

pub mod encoder;
pub mod signer;
pub mod types;

pub use encoder::{execute_batch_payload, execute_payload, set_data_payload, ControllerGrant};
pub use signer::{address_of, lsp25_digest, sign_relay_call, K256Recovery};
pub use types::RelayCallEnvelope;

#[cfg(test)]
mod tests;
