//! The key manager as one object: reentrancy guard, verification, relay authentication and
//! hand-off to whatever performs the authorized call.

use alloc::vec::Vec;
use core::cell::RefCell;

use alloy_primitives::{Address, Bytes, U256};
use tracing::{debug, warn};

use lsp6_permission_types::SignatureScheme;

use crate::{
    account::Account,
    config::EngineConfig,
    errors::{Denial, KeyManagerError},
    nonce::{NonceManager, NonceStore},
    reentrancy::ReentrancyGuard,
    registry::PermissionRegistry,
    relay::{check_batch_value, RelayCall, RelayExecutor},
    verifier::PermissionVerifier,
};

/// A payload the engine has authorized, ready to be run against the account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizedCall {
    pub controller: Address,
    pub payload: Bytes,
    pub value: U256,
}

/// Runs an authorized call. `Err` carries the callee's revert data.
pub trait ActionExecutor {
    fn perform(&mut self, call: &AuthorizedCall) -> Result<Bytes, Bytes>;
}

impl<F> ActionExecutor for F
where
    F: FnMut(&AuthorizedCall) -> Result<Bytes, Bytes>,
{
    fn perform(&mut self, call: &AuthorizedCall) -> Result<Bytes, Bytes> {
        self(call)
    }
}

/// Every entry point takes `&self`, so an executor may call back into the engine while a
/// call is in flight. Such nested calls go through the reentrancy guard.
pub struct KeyManagerEngine<A, N, S> {
    config: EngineConfig,
    account: A,
    nonces: RefCell<NonceManager<N>>,
    guard: ReentrancyGuard,
    scheme: S,
}

impl<A, N, S> KeyManagerEngine<A, N, S>
where
    A: Account,
    N: NonceStore,
    S: SignatureScheme,
{
    pub fn new(config: EngineConfig, account: A, nonce_store: N, scheme: S) -> Self {
        Self {
            config,
            account,
            nonces: RefCell::new(NonceManager::new(nonce_store)),
            guard: ReentrancyGuard::new(),
            scheme,
        }
    }

    /// Replace the guard, e.g. with one seeded from persisted state.
    pub fn with_guard(mut self, guard: ReentrancyGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn account(&self) -> &A {
        &self.account
    }

    pub fn account_mut(&mut self) -> &mut A {
        &mut self.account
    }

    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    pub fn registry(&self) -> PermissionRegistry<'_, A> {
        PermissionRegistry::new(&self.account)
    }

    fn verifier(&self) -> PermissionVerifier<'_, A> {
        PermissionVerifier::new(&self.account, &self.config)
    }

    /// Authorize `payload` for `caller` and run it with `value` attached.
    pub fn execute<E: ActionExecutor + ?Sized>(
        &self,
        caller: Address,
        payload: &[u8],
        value: U256,
        executor: &mut E,
    ) -> Result<Bytes, KeyManagerError> {
        let permissions = self.registry().permissions_of(caller)?;
        let _scope = self.guard.enter(caller, permissions)?;

        self.verifier().verify_payload(caller, payload)?;
        self.perform(caller, payload, value, executor)
    }

    /// Payloads run in order; the first failure fails the batch and later payloads never run.
    pub fn execute_batch<E: ActionExecutor + ?Sized>(
        &self,
        caller: Address,
        values: &[U256],
        payloads: &[Bytes],
        value_sent: U256,
        executor: &mut E,
    ) -> Result<Vec<Bytes>, KeyManagerError> {
        if values.len() != payloads.len() {
            return Err(Denial::ParametersLengthMismatch.into());
        }
        check_batch_value(values, value_sent)?;

        values
            .iter()
            .zip(payloads)
            .map(|(value, payload)| self.execute(caller, payload, *value, &mut *executor))
            .collect()
    }

    /// Authenticate a signed relay call and run it on behalf of its signer.
    ///
    /// The nonce is spent once the signature checks out, even if the signer turns out not to
    /// be allowed to run the payload. That holds for this engine's own nonce store only: the
    /// Stylus contract reverts on any denial, which rolls the nonce back with it.
    pub fn relay_execute<E: ActionExecutor + ?Sized>(
        &self,
        call: &RelayCall,
        now: u64,
        executor: &mut E,
    ) -> Result<Bytes, KeyManagerError> {
        let relay = RelayExecutor::new(&self.scheme, &self.config);
        let signer = relay.authenticate(call, now, &mut self.nonces.borrow_mut())?;

        let permissions = self.registry().permissions_of(signer)?;
        let _scope = self.guard.enter(signer, permissions)?;

        relay.authorize(signer, &call.payload, &self.verifier())?;
        self.perform(signer, &call.payload, call.value, executor)
    }

    pub fn relay_execute_batch<E: ActionExecutor + ?Sized>(
        &self,
        calls: &[RelayCall],
        value_sent: U256,
        now: u64,
        executor: &mut E,
    ) -> Result<Vec<Bytes>, KeyManagerError> {
        let values: Vec<U256> = calls.iter().map(|call| call.value).collect();
        check_batch_value(&values, value_sent)?;

        calls.iter().map(|call| self.relay_execute(call, now, &mut *executor)).collect()
    }

    pub fn get_nonce(&self, controller: Address, channel: U256) -> Result<U256, Denial> {
        self.nonces.borrow().get_nonce(controller, channel)
    }

    fn perform<E: ActionExecutor + ?Sized>(
        &self,
        controller: Address,
        payload: &[u8],
        value: U256,
        executor: &mut E,
    ) -> Result<Bytes, KeyManagerError> {
        let call = AuthorizedCall { controller, payload: Bytes::copy_from_slice(payload), value };
        match executor.perform(&call) {
            Ok(output) => {
                debug!(%controller, %value, "call performed");
                Ok(output)
            }
            Err(revert) => {
                warn!(%controller, ?revert, "call reverted");
                Err(KeyManagerError::ActionReverted(revert))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, FixedBytes, B256};
    use alloy_sol_types::SolCall;
    use assert_matches::assert_matches;
    use lsp6_permission_types::{
        InterfaceProbe, KeyValueStore, MemoryAccount, OwnershipView, Permissions, SignatureError, StoreError,
    };

    use crate::{account::interfaces::IERC725X, nonce::MemoryNonceStore, reentrancy::GuardState};

    const CONTROLLER: Address = address!("cccccccccccccccccccccccccccccccccccccccc");
    const RECIPIENT: Address = address!("dddddddddddddddddddddddddddddddddddddddd");

    struct NoSignatures;

    impl SignatureScheme for NoSignatures {
        fn recover_signer(&self, _digest: B256, _signature: &[u8]) -> Result<Address, SignatureError> {
            Err(SignatureError::Unrecoverable)
        }
    }

    fn engine(permissions: Permissions) -> KeyManagerEngine<MemoryAccount, MemoryNonceStore, NoSignatures> {
        let mut account = MemoryAccount::new();
        account.set_permissions(CONTROLLER, permissions);
        KeyManagerEngine::new(
            EngineConfig::new(
                address!("acc0acc0acc0acc0acc0acc0acc0acc0acc0acc0"),
                address!("4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b"),
                42,
            ),
            account,
            MemoryNonceStore::default(),
            NoSignatures,
        )
    }

    fn accept_all(_: &AuthorizedCall) -> Result<Bytes, Bytes> {
        Ok(Bytes::new())
    }

    fn plain_call(value: u64) -> Bytes {
        IERC725X::executeCall {
            operationType: U256::ZERO,
            target: RECIPIENT,
            value: U256::from(value),
            data: Bytes::new(),
        }
        .abi_encode()
        .into()
    }

    #[test]
    fn performs_authorized_payload() {
        let engine = engine(Permissions::SUPER_CALL);
        let mut seen = Vec::new();
        let mut executor = |call: &AuthorizedCall| -> Result<Bytes, Bytes> {
            seen.push(call.clone());
            Ok(Bytes::from_static(b"ok"))
        };

        let out = engine.execute(CONTROLLER, &plain_call(0), U256::ZERO, &mut executor);
        assert_eq!(out, Ok(Bytes::from_static(b"ok")));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].controller, CONTROLLER);
        assert_eq!(engine.guard().state(), GuardState::Idle);
    }

    #[test]
    fn denied_payload_is_never_performed() {
        let engine = engine(Permissions::CALL);
        let mut performed = false;
        let mut executor = |_: &AuthorizedCall| -> Result<Bytes, Bytes> {
            performed = true;
            Ok(Bytes::new())
        };

        assert_matches!(
            engine.execute(CONTROLLER, &plain_call(0), U256::ZERO, &mut executor),
            Err(KeyManagerError::Denied(Denial::NoCallsAllowed { .. }))
        );
        assert!(!performed);
        assert_eq!(engine.guard().state(), GuardState::Idle);
    }

    #[test]
    fn revert_data_propagates() {
        let engine = engine(Permissions::SUPER_CALL);
        let mut executor = |_: &AuthorizedCall| -> Result<Bytes, Bytes> { Err(Bytes::from_static(b"boom")) };
        assert_eq!(
            engine.execute(CONTROLLER, &plain_call(0), U256::ZERO, &mut executor),
            Err(KeyManagerError::ActionReverted(Bytes::from_static(b"boom")))
        );
        assert_eq!(engine.guard().state(), GuardState::Idle);
    }

    #[test]
    fn batch_checks_shape_and_value() {
        let engine = engine(Permissions::SUPER_CALL | Permissions::SUPER_TRANSFERVALUE);
        let mut executor = accept_all;
        let payloads = [plain_call(1), plain_call(2)];
        let values = [U256::from(1u8), U256::from(2u8)];

        assert_eq!(
            engine.execute_batch(CONTROLLER, &values[..1], &payloads, U256::from(1u8), &mut executor),
            Err(KeyManagerError::Denied(Denial::ParametersLengthMismatch))
        );
        assert_matches!(
            engine.execute_batch(CONTROLLER, &values, &payloads, U256::from(2u8), &mut executor),
            Err(KeyManagerError::Denied(Denial::BatchInsufficientValueSent { .. }))
        );
        assert_eq!(
            engine
                .execute_batch(CONTROLLER, &values, &payloads, U256::from(3u8), &mut executor)
                .map(|outputs| outputs.len()),
            Ok(2)
        );
    }

    #[test]
    fn unsigned_relay_call_is_rejected() {
        let engine = engine(Permissions::ALL_PERMISSIONS);
        let call = RelayCall {
            signature: Bytes::from_static(&[0u8; 65]),
            nonce: U256::ZERO,
            validity_timestamps: U256::ZERO,
            value: U256::ZERO,
            payload: plain_call(0),
            chain_id: 42,
        };
        let mut executor = accept_all;
        assert_eq!(
            engine.relay_execute(&call, 0, &mut executor),
            Err(KeyManagerError::Denied(Denial::InvalidSignature(SignatureError::Unrecoverable)))
        );
    }

    #[test]
    fn invocation_nested_in_a_persisted_call() {
        let nested = || ReentrancyGuard::with_state(GuardState::Active(Address::ZERO));

        let engine = engine(Permissions::SUPER_CALL).with_guard(nested());
        assert_eq!(
            engine.execute(CONTROLLER, &plain_call(0), U256::ZERO, &mut accept_all),
            Err(KeyManagerError::Denied(Denial::NotAuthorised { controller: CONTROLLER, permission: "REENTRANCY" }))
        );

        let engine = self::engine(Permissions::SUPER_CALL | Permissions::REENTRANCY).with_guard(nested());
        assert_eq!(engine.execute(CONTROLLER, &plain_call(0), U256::ZERO, &mut accept_all), Ok(Bytes::new()));
        // the outer invocation owns the flag
        assert_eq!(engine.guard().state(), GuardState::Active(Address::ZERO));
    }

    /// An account whose `getData` always reverts.
    struct Unreachable;

    impl KeyValueStore for Unreachable {
        fn get(&self, _key: B256) -> Result<Bytes, StoreError> {
            Err(StoreError::CallFailed(Bytes::from_static(b"paused")))
        }
    }

    impl InterfaceProbe for Unreachable {
        fn supports(&self, _target: Address, _standard: FixedBytes<4>) -> bool {
            false
        }
    }

    impl OwnershipView for Unreachable {
        fn pending_owner(&self) -> Address {
            Address::ZERO
        }
    }

    #[test]
    fn unreadable_account_is_never_called() {
        let engine = KeyManagerEngine::new(
            EngineConfig::new(Address::ZERO, Address::repeat_byte(0x4b), 42),
            Unreachable,
            MemoryNonceStore::default(),
            NoSignatures,
        );
        let mut performed = false;
        let mut executor = |_: &AuthorizedCall| -> Result<Bytes, Bytes> {
            performed = true;
            Ok(Bytes::new())
        };

        let err = engine.execute(CONTROLLER, &plain_call(0), U256::ZERO, &mut executor).unwrap_err();
        assert_matches!(err.denial(), Some(Denial::AccountUnreadable { .. }));
        assert_eq!(err.revert_data(), b"paused".to_vec());
        assert!(!performed);
    }

    #[test]
    fn nonce_query() {
        let engine = engine(Permissions::NONE);
        assert_eq!(engine.get_nonce(CONTROLLER, U256::from(2u8)), Ok(U256::from(2u8) << 128usize));
    }
}
