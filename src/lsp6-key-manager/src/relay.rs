//! LSP25 relayed execution: a controller signs a call off-chain and anyone submits it.

use alloc::vec::Vec;

use alloy_primitives::{Address, Bytes, U256};
use tracing::{debug, warn};

use lsp6_permission_types::{Permissions, SignatureScheme};

use crate::{
    account::Account,
    config::EngineConfig,
    errors::Denial,
    nonce::{split, NonceManager, NonceStore},
    utils::relay_message::{lsp25_message, relay_digest, validity_window},
    verifier::{require, PermissionVerifier},
};

/// A signed relay call as submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayCall {
    pub signature: Bytes,
    /// `(channel << 128) | sequence`.
    pub nonce: U256,
    /// `(start << 128) | end`, seconds. Zero disables a bound.
    pub validity_timestamps: U256,
    /// Value forwarded with the payload.
    pub value: U256,
    pub payload: Bytes,
    /// Chain the signer signed for.
    pub chain_id: u64,
}

impl RelayCall {
    /// The LSP25 message covered by the signature.
    pub fn message(&self) -> Vec<u8> {
        lsp25_message(self.chain_id, self.nonce, self.validity_timestamps, self.value, &self.payload)
    }

    /// Zip the parallel arrays of a relay batch.
    pub fn batch(
        signatures: &[Bytes],
        nonces: &[U256],
        validity_timestamps: &[U256],
        values: &[U256],
        payloads: &[Bytes],
        chain_id: u64,
    ) -> Result<Vec<RelayCall>, Denial> {
        let len = signatures.len();
        if [nonces.len(), validity_timestamps.len(), values.len(), payloads.len()]
            .iter()
            .any(|other| *other != len)
        {
            return Err(Denial::ParametersLengthMismatch);
        }

        Ok((0..len)
            .map(|i| RelayCall {
                signature: signatures[i].clone(),
                nonce: nonces[i],
                validity_timestamps: validity_timestamps[i],
                value: values[i],
                payload: payloads[i].clone(),
                chain_id,
            })
            .collect())
    }
}

pub struct RelayExecutor<'a, S: ?Sized> {
    scheme: &'a S,
    config: &'a EngineConfig,
}

impl<'a, S: SignatureScheme + ?Sized> RelayExecutor<'a, S> {
    pub fn new(scheme: &'a S, config: &'a EngineConfig) -> Self {
        Self { scheme, config }
    }

    /// Recover the signer and consume its nonce. Permissions are not looked at yet, so a
    /// later denial still leaves the nonce consumed.
    pub fn authenticate<N: NonceStore>(
        &self,
        call: &RelayCall,
        now: u64,
        nonces: &mut NonceManager<N>,
    ) -> Result<Address, Denial> {
        if call.chain_id != self.config.chain_id {
            return Err(Denial::ChainMismatch { expected: self.config.chain_id, actual: call.chain_id });
        }

        let digest = relay_digest(self.config.key_manager, &call.message());
        let signer = self
            .scheme
            .recover_signer(digest, &call.signature)
            .map_err(Denial::InvalidSignature)?;

        let (start, end) = validity_window(call.validity_timestamps);
        let now = u128::from(now);
        if now < start {
            return Err(Denial::RelayCallBeforeStartTime);
        }
        if end != 0 && now > end {
            return Err(Denial::RelayCallExpired);
        }

        let (channel, sequence) = split(call.nonce);
        if let Err(reason) = nonces.consume(signer, channel, sequence) {
            warn!(%signer, channel, %reason, "relay nonce rejected");
            return Err(Denial::InvalidRelayNonce {
                signer,
                nonce: call.nonce,
                signature: call.signature.clone(),
            });
        }

        debug!(%signer, channel, sequence, "relay call authenticated");
        Ok(signer)
    }

    /// The signer must hold `EXECUTE_RELAY_CALL` and be allowed to run `payload`. A signer
    /// without any permission is refused the same way as on a direct call.
    pub fn authorize<A: Account + ?Sized>(
        &self,
        signer: Address,
        payload: &[u8],
        verifier: &PermissionVerifier<'_, A>,
    ) -> Result<(), Denial> {
        let permissions = verifier.permissions_of(signer)?;
        require(signer, permissions, Permissions::EXECUTE_RELAY_CALL)?;
        verifier.verify_payload(signer, payload)
    }

    /// `authenticate` then `authorize`; returns the signer.
    pub fn execute<A: Account + ?Sized, N: NonceStore>(
        &self,
        call: &RelayCall,
        now: u64,
        nonces: &mut NonceManager<N>,
        verifier: &PermissionVerifier<'_, A>,
    ) -> Result<Address, Denial> {
        let signer = self.authenticate(call, now, nonces)?;
        self.authorize(signer, &call.payload, verifier)?;
        Ok(signer)
    }
}

/// The values of a batch must add up to exactly what was sent with it.
pub fn check_batch_value(values: &[U256], sent: U256) -> Result<(), Denial> {
    let total = values.iter().fold(U256::ZERO, |total, value| total.saturating_add(*value));
    if total > sent {
        return Err(Denial::BatchInsufficientValueSent { total, sent });
    }
    if total < sent {
        return Err(Denial::BatchExcessiveValueSent { total, sent });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256, B256};
    use assert_matches::assert_matches;
    use lsp6_permission_types::{MemoryAccount, SignatureError};

    use crate::{account::interfaces::IERC725X, nonce::MemoryNonceStore};
    use alloy_sol_types::SolCall;

    const SIGNER: Address = address!("5151515151515151515151515151515151515151");
    const RECIPIENT: Address = address!("dddddddddddddddddddddddddddddddddddddddd");

    /// Treats the first 20 bytes of the signature as the signer, ignoring the digest.
    struct EchoScheme;

    impl SignatureScheme for EchoScheme {
        fn recover_signer(&self, _digest: B256, signature: &[u8]) -> Result<Address, SignatureError> {
            if signature.len() != 65 {
                return Err(SignatureError::InvalidLength(signature.len()));
            }
            Ok(Address::from_slice(&signature[..20]))
        }
    }

    /// Recovers SIGNER only for the digest it was built with.
    struct DigestBound(B256);

    impl SignatureScheme for DigestBound {
        fn recover_signer(&self, digest: B256, _signature: &[u8]) -> Result<Address, SignatureError> {
            if digest == self.0 {
                Ok(SIGNER)
            } else {
                Ok(Address::from_word(keccak256(digest)))
            }
        }
    }

    fn config() -> EngineConfig {
        EngineConfig::new(
            address!("acc0acc0acc0acc0acc0acc0acc0acc0acc0acc0"),
            address!("4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b"),
            42,
        )
    }

    fn signed_by(signer: Address) -> Bytes {
        let mut signature = [0u8; 65];
        signature[..20].copy_from_slice(signer.as_slice());
        signature[64] = 27;
        Bytes::copy_from_slice(&signature)
    }

    fn call_with(nonce: U256, validity_timestamps: U256) -> RelayCall {
        RelayCall {
            signature: signed_by(SIGNER),
            nonce,
            validity_timestamps,
            value: U256::ZERO,
            payload: IERC725X::executeCall {
                operationType: U256::ZERO,
                target: RECIPIENT,
                value: U256::ZERO,
                data: Bytes::new(),
            }
            .abi_encode()
            .into(),
            chain_id: 42,
        }
    }

    fn nonces() -> NonceManager<MemoryNonceStore> {
        NonceManager::new(MemoryNonceStore::default())
    }

    #[test]
    fn nonce_is_consumed_once() {
        let config = config();
        let relay = RelayExecutor::new(&EchoScheme, &config);
        let mut nonces = nonces();
        let call = call_with(U256::ZERO, U256::ZERO);

        assert_eq!(relay.authenticate(&call, 1_000, &mut nonces), Ok(SIGNER));
        assert_eq!(
            relay.authenticate(&call, 1_000, &mut nonces),
            Err(Denial::InvalidRelayNonce { signer: SIGNER, nonce: U256::ZERO, signature: call.signature.clone() })
        );
    }

    #[test]
    fn channels_do_not_interfere() {
        let config = config();
        let relay = RelayExecutor::new(&EchoScheme, &config);
        let mut nonces = nonces();
        let channel_5 = U256::from(5u8) << 128usize;

        assert!(relay.authenticate(&call_with(channel_5, U256::ZERO), 0, &mut nonces).is_ok());
        assert!(relay.authenticate(&call_with(U256::ZERO, U256::ZERO), 0, &mut nonces).is_ok());
        assert!(relay.authenticate(&call_with(channel_5 | U256::from(1u8), U256::ZERO), 0, &mut nonces).is_ok());
    }

    #[test]
    fn validity_window_is_enforced() {
        let config = config();
        let relay = RelayExecutor::new(&EchoScheme, &config);
        let window = (U256::from(100u8) << 128usize) | U256::from(200u8);

        assert_eq!(
            relay.authenticate(&call_with(U256::ZERO, window), 99, &mut nonces()),
            Err(Denial::RelayCallBeforeStartTime)
        );
        assert_eq!(
            relay.authenticate(&call_with(U256::ZERO, window), 201, &mut nonces()),
            Err(Denial::RelayCallExpired)
        );
        assert_eq!(relay.authenticate(&call_with(U256::ZERO, window), 200, &mut nonces()), Ok(SIGNER));

        // start only
        let open_ended = U256::from(100u8) << 128usize;
        assert_eq!(relay.authenticate(&call_with(U256::ZERO, open_ended), u64::MAX, &mut nonces()), Ok(SIGNER));
    }

    #[test]
    fn rejected_window_leaves_nonce_untouched() {
        let config = config();
        let relay = RelayExecutor::new(&EchoScheme, &config);
        let mut nonces = nonces();
        let expired = U256::from(10u8);

        assert!(relay.authenticate(&call_with(U256::ZERO, expired), 11, &mut nonces).is_err());
        assert_eq!(nonces.next_expected(SIGNER, 0), 0);
    }

    #[test]
    fn wrong_chain_and_bad_signature() {
        let config = config();
        let relay = RelayExecutor::new(&EchoScheme, &config);

        let mut call = call_with(U256::ZERO, U256::ZERO);
        call.chain_id = 1;
        assert_eq!(
            relay.authenticate(&call, 0, &mut nonces()),
            Err(Denial::ChainMismatch { expected: 42, actual: 1 })
        );

        let mut call = call_with(U256::ZERO, U256::ZERO);
        call.signature = Bytes::from_static(&[0u8; 64]);
        assert_eq!(
            relay.authenticate(&call, 0, &mut nonces()),
            Err(Denial::InvalidSignature(SignatureError::InvalidLength(64)))
        );
    }

    #[test]
    fn signature_covers_every_field() {
        let config = config();
        let call = call_with(U256::ZERO, U256::ZERO);
        let scheme = DigestBound(relay_digest(config.key_manager, &call.message()));
        let relay = RelayExecutor::new(&scheme, &config);

        assert_eq!(relay.authenticate(&call, 0, &mut nonces()), Ok(SIGNER));

        let mut tampered = call.clone();
        tampered.value = U256::from(1u8);
        // a different digest recovers some other address, whose nonce 0 is still free
        assert_ne!(relay.authenticate(&tampered, 0, &mut nonces()), Ok(SIGNER));
    }

    #[test]
    fn signer_needs_execute_relay_call() {
        let config = config();
        let relay = RelayExecutor::new(&EchoScheme, &config);
        let call = call_with(U256::ZERO, U256::ZERO);

        let mut account = MemoryAccount::new();
        account.set_permissions(SIGNER, Permissions::SUPER_CALL);
        let verifier = PermissionVerifier::new(&account, &config);
        let mut nonces = nonces();

        assert_eq!(
            relay.execute(&call, 0, &mut nonces, &verifier),
            Err(Denial::NotAuthorised { controller: SIGNER, permission: "EXECUTE_RELAY_CALL" })
        );
        // the nonce was spent before the permission check
        assert_eq!(nonces.next_expected(SIGNER, 0), 1);

        account.set_permissions(SIGNER, Permissions::SUPER_CALL | Permissions::EXECUTE_RELAY_CALL);
        let verifier = PermissionVerifier::new(&account, &config);
        let next = call_with(U256::from(1u8), U256::ZERO);
        assert_eq!(relay.execute(&next, 0, &mut nonces, &verifier), Ok(SIGNER));
    }

    #[test]
    fn signer_without_permissions_is_unknown() {
        let config = config();
        let relay = RelayExecutor::new(&EchoScheme, &config);
        let account = MemoryAccount::new();
        let verifier = PermissionVerifier::new(&account, &config);

        assert_eq!(
            relay.execute(&call_with(U256::ZERO, U256::ZERO), 0, &mut nonces(), &verifier),
            Err(Denial::NoPermissionsSet { controller: SIGNER })
        );
    }

    #[test]
    fn batch_arrays_must_line_up() {
        let one = [U256::ZERO];
        let signatures = [signed_by(SIGNER)];
        let payloads = [Bytes::new()];

        let calls = RelayCall::batch(&signatures, &one, &one, &one, &payloads, 42).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].chain_id, 42);
        assert_eq!(
            RelayCall::batch(&signatures, &[], &one, &one, &payloads, 42),
            Err(Denial::ParametersLengthMismatch)
        );
    }

    #[test]
    fn batch_value_must_match() {
        let values = [U256::from(1u8), U256::from(2u8)];
        assert_eq!(check_batch_value(&values, U256::from(3u8)), Ok(()));
        assert_matches!(
            check_batch_value(&values, U256::from(2u8)),
            Err(Denial::BatchInsufficientValueSent { .. })
        );
        assert_matches!(
            check_batch_value(&values, U256::from(4u8)),
            Err(Denial::BatchExcessiveValueSent { .. })
        );
        assert_eq!(check_batch_value(&[], U256::ZERO), Ok(()));
    }
}
