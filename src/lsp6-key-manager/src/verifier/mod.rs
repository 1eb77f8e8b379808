//! Authorization rules.
//!
//! Every entry point is a pure function of the controller, the request and the account's
//! current state. `Ok(())` means allow.

mod execute;
mod ownership;
mod payload;
mod set_data;

use alloy_primitives::{Address, Bytes, U256};

use lsp6_permission_types::Permissions;

use crate::{account::Account, config::EngineConfig, errors::Denial, registry::PermissionRegistry};

pub use ownership::OwnershipAction;
pub use payload::{decode_payload, Erc725Call};

/// ERC725X operation types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Call,
    Create,
    Create2,
    StaticCall,
    DelegateCall,
}

impl TryFrom<U256> for Operation {
    type Error = Denial;

    fn try_from(raw: U256) -> Result<Self, Denial> {
        let operation = match raw.as_limbs() {
            [0, 0, 0, 0] => Operation::Call,
            [1, 0, 0, 0] => Operation::Create,
            [2, 0, 0, 0] => Operation::Create2,
            [3, 0, 0, 0] => Operation::StaticCall,
            [4, 0, 0, 0] => Operation::DelegateCall,
            _ => return Err(Denial::UnknownOperationType { operation: raw }),
        };
        Ok(operation)
    }
}

impl From<Operation> for U256 {
    fn from(operation: Operation) -> U256 {
        let raw: u8 = match operation {
            Operation::Call => 0,
            Operation::Create => 1,
            Operation::Create2 => 2,
            Operation::StaticCall => 3,
            Operation::DelegateCall => 4,
        };
        U256::from(raw)
    }
}

/// One ERC725X execution the account would perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    pub operation: Operation,
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
}

impl Execution {
    pub fn call(target: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self { operation: Operation::Call, target, value, data: data.into() }
    }

    pub fn static_call(target: Address, data: impl Into<Bytes>) -> Self {
        Self { operation: Operation::StaticCall, target, value: U256::ZERO, data: data.into() }
    }
}

pub struct PermissionVerifier<'a, A: ?Sized> {
    account: &'a A,
    config: &'a EngineConfig,
}

impl<'a, A: Account + ?Sized> PermissionVerifier<'a, A> {
    pub fn new(account: &'a A, config: &'a EngineConfig) -> Self {
        Self { account, config }
    }

    pub fn registry(&self) -> PermissionRegistry<'a, A> {
        PermissionRegistry::new(self.account)
    }

    /// Permissions of `controller`, refusing controllers with none.
    pub(crate) fn permissions_of(&self, controller: Address) -> Result<Permissions, Denial> {
        let permissions = self.registry().permissions_of(controller)?;
        if permissions.is_empty() {
            return Err(Denial::NoPermissionsSet { controller });
        }
        Ok(permissions)
    }
}

/// `NotAuthorised` naming the first missing bit of `required`.
pub(crate) fn require(
    controller: Address,
    held: Permissions,
    required: Permissions,
) -> Result<(), Denial> {
    if held.has(required) {
        return Ok(());
    }
    Err(Denial::not_authorised(controller, held.missing(required).name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn operation_round_trips_through_u256() {
        for operation in [
            Operation::Call,
            Operation::Create,
            Operation::Create2,
            Operation::StaticCall,
            Operation::DelegateCall,
        ] {
            assert_eq!(Operation::try_from(<U256 as From<Operation>>::from(operation)), Ok(operation));
        }
        assert_matches!(
            Operation::try_from(U256::from(5u8)),
            Err(Denial::UnknownOperationType { operation }) if operation == U256::from(5u8)
        );
    }

    #[test]
    fn require_names_the_missing_bit() {
        let controller = Address::repeat_byte(0x11);
        assert_eq!(require(controller, Permissions::CALL, Permissions::CALL), Ok(()));
        assert_eq!(
            require(controller, Permissions::CALL, Permissions::SETDATA),
            Err(Denial::NotAuthorised { controller, permission: "SETDATA" })
        );
    }
}
