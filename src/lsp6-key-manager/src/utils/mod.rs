//! Relay message encoding and signer recovery.

#[cfg(feature = "contract")]
pub mod crypto;
pub mod relay_message;
