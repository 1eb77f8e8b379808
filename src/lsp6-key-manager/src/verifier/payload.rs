//! ERC725 payload decoding and dispatch.

use alloc::vec::Vec;

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolCall;
use tracing::trace;

use super::{Execution, Operation, OwnershipAction, PermissionVerifier};
use crate::{
    account::{
        interfaces::{IERC725X, IERC725Y, ILSP14Ownable2Step},
        Account,
    },
    errors::Denial,
};

/// A decoded call on the controlled account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Erc725Call {
    /// `setData` and `setDataBatch`, normalized to parallel arrays.
    SetData { keys: Vec<B256>, values: Vec<Bytes> },
    Execute(Execution),
    ExecuteBatch { operations: Vec<U256>, targets: Vec<Address>, values: Vec<U256>, datas: Vec<Bytes> },
    Ownership(OwnershipAction),
}

const SET_DATA: [u8; 4] = IERC725Y::setDataCall::SELECTOR;
const SET_DATA_BATCH: [u8; 4] = IERC725Y::setDataBatchCall::SELECTOR;
const EXECUTE: [u8; 4] = IERC725X::executeCall::SELECTOR;
const EXECUTE_BATCH: [u8; 4] = IERC725X::executeBatchCall::SELECTOR;
const TRANSFER_OWNERSHIP: [u8; 4] = ILSP14Ownable2Step::transferOwnershipCall::SELECTOR;
const ACCEPT_OWNERSHIP: [u8; 4] = ILSP14Ownable2Step::acceptOwnershipCall::SELECTOR;
const RENOUNCE_OWNERSHIP: [u8; 4] = ILSP14Ownable2Step::renounceOwnershipCall::SELECTOR;

fn decode<C: SolCall>(payload: &[u8]) -> Result<C, Denial> {
    C::abi_decode(payload, true).map_err(|_| Denial::InvalidPayload { payload: Bytes::copy_from_slice(payload) })
}

pub fn decode_payload(payload: &[u8]) -> Result<Erc725Call, Denial> {
    let Some(&selector) = payload.first_chunk::<4>() else {
        return Err(Denial::InvalidPayload { payload: Bytes::copy_from_slice(payload) });
    };

    let call = match selector {
        SET_DATA => {
            let call = decode::<IERC725Y::setDataCall>(payload)?;
            Erc725Call::SetData { keys: vec![call.dataKey], values: vec![call.dataValue] }
        }
        SET_DATA_BATCH => {
            let call = decode::<IERC725Y::setDataBatchCall>(payload)?;
            Erc725Call::SetData { keys: call.dataKeys, values: call.dataValues }
        }
        EXECUTE => {
            let call = decode::<IERC725X::executeCall>(payload)?;
            Erc725Call::Execute(Execution {
                operation: Operation::try_from(call.operationType)?,
                target: call.target,
                value: call.value,
                data: call.data,
            })
        }
        EXECUTE_BATCH => {
            let call = decode::<IERC725X::executeBatchCall>(payload)?;
            Erc725Call::ExecuteBatch {
                operations: call.operationsType,
                targets: call.targets,
                values: call.values,
                datas: call.datas,
            }
        }
        TRANSFER_OWNERSHIP => {
            let call = decode::<ILSP14Ownable2Step::transferOwnershipCall>(payload)?;
            Erc725Call::Ownership(OwnershipAction::TransferOwnership(call.newOwner))
        }
        ACCEPT_OWNERSHIP => {
            decode::<ILSP14Ownable2Step::acceptOwnershipCall>(payload)?;
            Erc725Call::Ownership(OwnershipAction::AcceptOwnership)
        }
        RENOUNCE_OWNERSHIP => {
            decode::<ILSP14Ownable2Step::renounceOwnershipCall>(payload)?;
            Erc725Call::Ownership(OwnershipAction::RenounceOwnership)
        }
        other => return Err(Denial::InvalidERC725Function { selector: FixedBytes(other) }),
    };
    Ok(call)
}

impl<A: Account + ?Sized> PermissionVerifier<'_, A> {
    /// Decode `payload` and run the entry point for the function it calls.
    pub fn verify_payload(&self, controller: Address, payload: &[u8]) -> Result<(), Denial> {
        let call = decode_payload(payload)?;
        trace!(%controller, ?call, "dispatching payload");

        match &call {
            Erc725Call::SetData { keys, values } => self.verify_set_data(controller, keys, values),
            Erc725Call::Execute(execution) => self.verify_execute(controller, execution),
            Erc725Call::ExecuteBatch { operations, targets, values, datas } => {
                self.verify_execute_batch(controller, operations, targets, values, datas)
            }
            Erc725Call::Ownership(action) => self.verify_ownership_change(controller, *action),
        }
    }
}
