use alloc::vec::Vec;

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolError;

use lsp6_permission_types::{SignatureError, StoreError};

/// Solidity custom errors the key manager reverts with.
pub mod revert {
    use alloy_sol_types::sol;

    sol! {
        error NoPermissionsSet(address from);
        error NotAuthorised(address from, string permission);
        error NotAllowedCall(address from, address to, bytes4 selector);
        error NoCallsAllowed(address from);
        error InvalidWhitelistedCall(address from);
        error NotAllowedERC725YDataKey(address from, bytes32 disallowedKey);
        error NoERC725YDataKeysAllowed(address from);
        error NotRecognisedPermissionKey(bytes32 dataKey);
        error InvalidEncodedAllowedCalls(bytes allowedCallsValue);
        error InvalidEncodedAllowedERC725YDataKeys(bytes value);
        error AddressPermissionArrayIndexValueNotAnAddress(bytes32 dataKey, bytes invalidValue);
        error InvalidDataValuesForDataKeys(bytes32 dataKey, bytes dataValue);
        error BatchExecuteParamsLengthMismatch();
        error ERC725Y_DataKeysValuesEmptyArray();
        error DelegateCallDisallowedViaKeyManager();
        error ERC725X_UnknownOperationType(uint256 operationTypeProvided);
        error ERC725X_MsgValueDisallowedInStaticCall();
        error InvalidRelayNonce(address signer, uint256 invalidNonce, bytes signature);
        error InvalidRelaySignature();
        error RelayCallChainMismatch(uint256 expected, uint256 actual);
        error RelayCallBeforeStartTime();
        error RelayCallExpired();
        error NonceChannelOutOfRange(uint256 channel);
        error LSP6BatchInsufficientValueSent(uint256 totalValues, uint256 msgValue);
        error LSP6BatchExcessiveValueSent(uint256 totalValues, uint256 msgValue);
        error CallingKeyManagerNotAllowed();
        error InvalidPayload(bytes payload);
        error InvalidERC725Function(bytes4 invalidFunction);
        error LSP14CannotTransferOwnershipToSelf();
        error NotPendingOwner(address pendingOwner);
        error AccountDataUnreadable(bytes32 dataKey);
    }
}

/// Why a request was refused. Every variant is terminal for the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("no permissions set for {controller}")]
    NoPermissionsSet { controller: Address },

    #[error("{controller} is not authorised for {permission}")]
    NotAuthorised { controller: Address, permission: &'static str },

    #[error("{controller} is not allowed to call {target} with selector {selector}")]
    NotAllowedCall { controller: Address, target: Address, selector: FixedBytes<4> },

    #[error("{controller} has no allowed calls")]
    NoCallsAllowed { controller: Address },

    #[error("{controller} has an all-zero AllowedCalls entry")]
    InvalidWhitelistedCall { controller: Address },

    #[error("{controller} is not allowed to set data key {key}")]
    NotAllowedERC725YKey { controller: Address, key: B256 },

    #[error("{controller} may not mix permission keys with other data keys")]
    NoERC725YDataKeysAllowed { controller: Address },

    #[error("unrecognised permission key {key}")]
    NotRecognisedPermissionKey { key: B256 },

    #[error("invalid encoded AllowedCalls 0x{}", hex::encode(value))]
    InvalidEncodedAllowedCalls { value: Bytes },

    #[error("invalid compacted AllowedERC725YDataKeys 0x{}", hex::encode(value))]
    InvalidCompactedAllowedERC725YDataKeys { value: Bytes },

    #[error("AddressPermissions[] value under {key} is not an address: 0x{}", hex::encode(value))]
    ArrayIndexValueNotAnAddress { key: B256, value: Bytes },

    #[error("invalid value for data key {key}: 0x{}", hex::encode(value))]
    InvalidDataValuesForDataKeys { key: B256, value: Bytes },

    #[error("parameter arrays differ in length")]
    ParametersLengthMismatch,

    #[error("empty parameter arrays")]
    EmptyArray,

    #[error("delegatecall is disallowed")]
    DelegateCallDisallowed,

    #[error("unknown operation type {operation}")]
    UnknownOperationType { operation: U256 },

    #[error("value cannot be sent with a staticcall")]
    MsgValueDisallowedInStaticCall,

    #[error("invalid relay nonce {nonce} for {signer}")]
    InvalidRelayNonce { signer: Address, nonce: U256, signature: Bytes },

    #[error("invalid relay signature: {0}")]
    InvalidSignature(SignatureError),

    #[error("relay call for chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("relay call is not valid yet")]
    RelayCallBeforeStartTime,

    #[error("relay call expired")]
    RelayCallExpired,

    #[error("nonce channel {channel} out of range")]
    ChannelOutOfRange { channel: U256 },

    #[error("batch values sum to {total}, more than the {sent} sent")]
    BatchInsufficientValueSent { total: U256, sent: U256 },

    #[error("batch values sum to {total}, less than the {sent} sent")]
    BatchExcessiveValueSent { total: U256, sent: U256 },

    #[error("calling the key manager through the account is not allowed")]
    CallingSelfNotAllowed,

    #[error("invalid payload 0x{}", hex::encode(payload))]
    InvalidPayload { payload: Bytes },

    #[error("unsupported ERC725 function {selector}")]
    InvalidERC725Function { selector: FixedBytes<4> },

    #[error("cannot transfer ownership to the account itself")]
    CannotTransferOwnershipToSelf,

    #[error("key manager is not the pending owner (pending: {pending})")]
    NotPendingOwner { pending: Address },

    /// The account could not be read, so nothing about the request can be decided.
    #[error("cannot read data key {key}: {error}")]
    AccountUnreadable { key: B256, error: StoreError },
}

impl Denial {
    pub(crate) fn not_authorised(controller: Address, permission: &'static str) -> Self {
        Denial::NotAuthorised { controller, permission }
    }

    /// ABI-encoded Solidity custom error, selector included.
    pub fn revert_data(&self) -> Vec<u8> {
        use revert as r;

        match self.clone() {
            Denial::NoPermissionsSet { controller } => r::NoPermissionsSet { from: controller }.abi_encode(),
            Denial::NotAuthorised { controller, permission } => {
                r::NotAuthorised { from: controller, permission: permission.into() }.abi_encode()
            }
            Denial::NotAllowedCall { controller, target, selector } => {
                r::NotAllowedCall { from: controller, to: target, selector }.abi_encode()
            }
            Denial::NoCallsAllowed { controller } => r::NoCallsAllowed { from: controller }.abi_encode(),
            Denial::InvalidWhitelistedCall { controller } => {
                r::InvalidWhitelistedCall { from: controller }.abi_encode()
            }
            Denial::NotAllowedERC725YKey { controller, key } => {
                r::NotAllowedERC725YDataKey { from: controller, disallowedKey: key }.abi_encode()
            }
            Denial::NoERC725YDataKeysAllowed { controller } => {
                r::NoERC725YDataKeysAllowed { from: controller }.abi_encode()
            }
            Denial::NotRecognisedPermissionKey { key } => {
                r::NotRecognisedPermissionKey { dataKey: key }.abi_encode()
            }
            Denial::InvalidEncodedAllowedCalls { value } => {
                r::InvalidEncodedAllowedCalls { allowedCallsValue: value }.abi_encode()
            }
            Denial::InvalidCompactedAllowedERC725YDataKeys { value } => {
                r::InvalidEncodedAllowedERC725YDataKeys { value }.abi_encode()
            }
            Denial::ArrayIndexValueNotAnAddress { key, value } => {
                r::AddressPermissionArrayIndexValueNotAnAddress { dataKey: key, invalidValue: value }
                    .abi_encode()
            }
            Denial::InvalidDataValuesForDataKeys { key, value } => {
                r::InvalidDataValuesForDataKeys { dataKey: key, dataValue: value }.abi_encode()
            }
            Denial::ParametersLengthMismatch => r::BatchExecuteParamsLengthMismatch {}.abi_encode(),
            Denial::EmptyArray => r::ERC725Y_DataKeysValuesEmptyArray {}.abi_encode(),
            Denial::DelegateCallDisallowed => r::DelegateCallDisallowedViaKeyManager {}.abi_encode(),
            Denial::UnknownOperationType { operation } => {
                r::ERC725X_UnknownOperationType { operationTypeProvided: operation }.abi_encode()
            }
            Denial::MsgValueDisallowedInStaticCall => {
                r::ERC725X_MsgValueDisallowedInStaticCall {}.abi_encode()
            }
            Denial::InvalidRelayNonce { signer, nonce, signature } => {
                r::InvalidRelayNonce { signer, invalidNonce: nonce, signature }.abi_encode()
            }
            Denial::InvalidSignature(_) => r::InvalidRelaySignature {}.abi_encode(),
            Denial::ChainMismatch { expected, actual } => r::RelayCallChainMismatch {
                expected: U256::from(expected),
                actual: U256::from(actual),
            }
            .abi_encode(),
            Denial::RelayCallBeforeStartTime => r::RelayCallBeforeStartTime {}.abi_encode(),
            Denial::RelayCallExpired => r::RelayCallExpired {}.abi_encode(),
            Denial::ChannelOutOfRange { channel } => r::NonceChannelOutOfRange { channel }.abi_encode(),
            Denial::BatchInsufficientValueSent { total, sent } => {
                r::LSP6BatchInsufficientValueSent { totalValues: total, msgValue: sent }.abi_encode()
            }
            Denial::BatchExcessiveValueSent { total, sent } => {
                r::LSP6BatchExcessiveValueSent { totalValues: total, msgValue: sent }.abi_encode()
            }
            Denial::CallingSelfNotAllowed => r::CallingKeyManagerNotAllowed {}.abi_encode(),
            Denial::InvalidPayload { payload } => r::InvalidPayload { payload }.abi_encode(),
            Denial::InvalidERC725Function { selector } => {
                r::InvalidERC725Function { invalidFunction: selector }.abi_encode()
            }
            Denial::CannotTransferOwnershipToSelf => {
                r::LSP14CannotTransferOwnershipToSelf {}.abi_encode()
            }
            Denial::NotPendingOwner { pending } => {
                r::NotPendingOwner { pendingOwner: pending }.abi_encode()
            }
            // the account's own revert bubbles up unchanged
            Denial::AccountUnreadable { error: StoreError::CallFailed(data), .. } => data.to_vec(),
            Denial::AccountUnreadable { key, error: StoreError::MalformedReturn } => {
                r::AccountDataUnreadable { dataKey: key }.abi_encode()
            }
        }
    }
}

/// Failure of an engine entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyManagerError {
    #[error(transparent)]
    Denied(#[from] Denial),

    /// The authorized call was forwarded and reverted with this data.
    #[error("forwarded call reverted: 0x{}", hex::encode(.0))]
    ActionReverted(Bytes),
}

impl KeyManagerError {
    /// Bytes to revert with: the custom error for denials, the callee's data otherwise.
    pub fn revert_data(&self) -> Vec<u8> {
        match self {
            KeyManagerError::Denied(denial) => denial.revert_data(),
            KeyManagerError::ActionReverted(data) => data.to_vec(),
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            KeyManagerError::Denied(denial) => Some(denial),
            KeyManagerError::ActionReverted(_) => None,
        }
    }
}
