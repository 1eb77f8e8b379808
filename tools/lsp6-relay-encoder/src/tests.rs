//! The encoder and signer against a live engine.

use alloy_primitives::{address, Address, Bytes, FixedBytes, U256};
use assert_matches::assert_matches;
use k256::ecdsa::SigningKey;

use lsp6_key_manager::{
    nonce::MemoryNonceStore,
    utils::relay_message::{lsp25_message, relay_digest},
    verifier::{decode_payload, Erc725Call, Operation},
    AuthorizedCall, Denial, EngineConfig, KeyManagerEngine, KeyManagerError,
};
use lsp6_permission_types::{
    calls::ANY_STANDARD, keys::CONTROLLERS_LENGTH_KEY, AllowedCall, CallTypes, MemoryAccount,
    Permissions, SignatureError, SignatureScheme,
};

use crate::{
    encoder::{execute_payload, ControllerGrant},
    signer::{address_of, lsp25_digest, sign_relay_call, K256Recovery},
    types::RelayCallEnvelope,
};

const ACCOUNT: Address = address!("acc0acc0acc0acc0acc0acc0acc0acc0acc0acc0");
const KEY_MANAGER: Address = address!("4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b");
const TOKEN: Address = address!("7070707070707070707070707070707070707070");
const CHAIN_ID: u64 = 4201;

// transfer(address,uint256)
const TRANSFER: FixedBytes<4> = FixedBytes([0xa9, 0x05, 0x9c, 0xbb]);

type Engine = KeyManagerEngine<MemoryAccount, MemoryNonceStore, K256Recovery>;

fn engine_with(account: MemoryAccount) -> Engine {
    KeyManagerEngine::new(
        EngineConfig::new(ACCOUNT, KEY_MANAGER, CHAIN_ID),
        account,
        MemoryNonceStore::default(),
        K256Recovery,
    )
}

fn key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

fn token_transfer() -> Bytes {
    let mut data = TRANSFER.to_vec();
    data.extend_from_slice(&[0u8; 64]);
    execute_payload(Operation::Call, TOKEN, U256::ZERO, data.into())
}

#[test]
fn digest_matches_the_key_manager() {
    let envelope = RelayCallEnvelope::new(KEY_MANAGER, CHAIN_ID, U256::from(7u8), token_transfer())
        .valid_between(100, 200)
        .with_value(U256::from(5u8));

    let message = lsp25_message(
        CHAIN_ID,
        envelope.nonce,
        envelope.validity_timestamps,
        envelope.value,
        &envelope.payload,
    );
    assert_eq!(lsp25_digest(&envelope), relay_digest(KEY_MANAGER, &message));
    assert_eq!(envelope.to_relay_call().message(), message);
}

#[test]
fn signature_recovers_the_signer() {
    let signing_key = key(3);
    let mut envelope = RelayCallEnvelope::new(KEY_MANAGER, CHAIN_ID, U256::ZERO, token_transfer());
    sign_relay_call(&mut envelope, &signing_key).unwrap();

    assert_eq!(envelope.signature.len(), 65);
    assert!(matches!(envelope.signature[64], 27 | 28));
    assert_eq!(
        K256Recovery.recover_signer(lsp25_digest(&envelope), &envelope.signature),
        Ok(address_of(signing_key.verifying_key()))
    );
}

#[test]
fn malformed_signatures() {
    let digest = lsp25_digest(&RelayCallEnvelope::new(KEY_MANAGER, CHAIN_ID, U256::ZERO, Bytes::new()));
    assert_eq!(K256Recovery.recover_signer(digest, &[0u8; 64]), Err(SignatureError::InvalidLength(64)));

    let mut bad_v = [1u8; 65];
    bad_v[64] = 29;
    assert_eq!(K256Recovery.recover_signer(digest, &bad_v), Err(SignatureError::InvalidRecoveryId(29)));
}

#[test]
fn relayed_grant_then_direct_call() {
    let admin_key = key(1);
    let admin = address_of(admin_key.verifying_key());
    let dapp = address_of(key(2).verifying_key());

    let mut account = MemoryAccount::new();
    account
        .set_permissions(admin, Permissions::ADDCONTROLLER | Permissions::EXECUTE_RELAY_CALL)
        .push_controller(admin);
    let mut engine = engine_with(account);

    let grant = ControllerGrant::new(dapp, Permissions::CALL).with_allowed_calls(&[AllowedCall::new(
        CallTypes::CALL,
        TOKEN,
        ANY_STANDARD,
        TRANSFER,
    )]);
    let mut envelope = RelayCallEnvelope::new(KEY_MANAGER, CHAIN_ID, U256::ZERO, grant.set_data_payload(Some(1)).unwrap());
    sign_relay_call(&mut envelope, &admin_key).unwrap();

    let mut performed = Vec::new();
    let mut executor = |call: &AuthorizedCall| -> Result<Bytes, Bytes> {
        performed.push(call.clone());
        Ok(Bytes::new())
    };
    engine.relay_execute(&envelope.to_relay_call(), 0, &mut executor).unwrap();
    assert_eq!(performed.len(), 1);
    assert_eq!(performed[0].controller, admin);

    // Apply the write the account would have made.
    let Ok(Erc725Call::SetData { keys, values }) = decode_payload(&performed[0].payload) else {
        panic!("setData payload");
    };
    engine.account_mut().set_many(&keys, &values);
    assert_eq!(engine.account().value(CONTROLLERS_LENGTH_KEY).as_ref(), &2u128.to_be_bytes());

    let mut accept = |_: &AuthorizedCall| -> Result<Bytes, Bytes> { Ok(Bytes::new()) };
    assert_eq!(engine.execute(dapp, &token_transfer(), U256::ZERO, &mut accept), Ok(Bytes::new()));

    // Replaying the signed grant fails on the spent nonce.
    assert_matches!(
        engine.relay_execute(&envelope.to_relay_call(), 0, &mut accept),
        Err(KeyManagerError::Denied(Denial::InvalidRelayNonce { .. }))
    );
}

#[test]
fn envelope_for_another_chain_is_refused() {
    let signing_key = key(4);
    let signer = address_of(signing_key.verifying_key());
    let mut account = MemoryAccount::new();
    account.set_permissions(signer, Permissions::ALL_PERMISSIONS);
    let engine = engine_with(account);

    let mut envelope = RelayCallEnvelope::new(KEY_MANAGER, CHAIN_ID + 1, U256::ZERO, token_transfer());
    sign_relay_call(&mut envelope, &signing_key).unwrap();

    let mut accept = |_: &AuthorizedCall| -> Result<Bytes, Bytes> { Ok(Bytes::new()) };
    assert_eq!(
        engine.relay_execute(&envelope.to_relay_call(), 0, &mut accept),
        Err(KeyManagerError::Denied(Denial::ChainMismatch { expected: CHAIN_ID, actual: CHAIN_ID + 1 }))
    );
}
