//! Signer recovery through the `ecrecover` precompile.

use alloy_primitives::{Address, B256};
use stylus_sdk::call::RawCall;

use lsp6_permission_types::{SignatureError, SignatureScheme};

const ECRECOVER: Address = Address::with_last_byte(1);
const ECRECOVER_GAS: u64 = 50_000;

/// Recovers `r || s || v` signatures with `v` in `{0, 1, 27, 28}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EcrecoverPrecompile;

impl SignatureScheme for EcrecoverPrecompile {
    fn recover_signer(&self, digest: B256, signature: &[u8]) -> Result<Address, SignatureError> {
        let signature: &[u8; 65] = signature
            .try_into()
            .map_err(|_| SignatureError::InvalidLength(signature.len()))?;

        let v = match signature[64] {
            v @ (27 | 28) => v,
            v @ (0 | 1) => v + 27,
            other => return Err(SignatureError::InvalidRecoveryId(other)),
        };

        let mut input = [0u8; 128];
        input[0..32].copy_from_slice(digest.as_slice());
        input[63] = v;
        input[64..128].copy_from_slice(&signature[0..64]);

        let out = unsafe { RawCall::new_static().gas(ECRECOVER_GAS).call(ECRECOVER, &input) }
            .map_err(|_| SignatureError::Unrecoverable)?;
        // an invalid signature yields empty output rather than a revert
        if out.len() < 32 {
            return Err(SignatureError::Unrecoverable);
        }
        let recovered = Address::from_slice(&out[12..32]);
        if recovered == Address::ZERO {
            return Err(SignatureError::Unrecoverable);
        }
        Ok(recovered)
    }
}
