use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use tracing::{debug, warn};

use lsp6_permission_types::{selector_of, AllowedCall, CallTypes, Permissions};

use super::{require, Execution, Operation, PermissionVerifier};
use crate::{account::Account, errors::Denial};

impl<A: Account + ?Sized> PermissionVerifier<'_, A> {
    pub fn verify_execute(&self, controller: Address, execution: &Execution) -> Result<(), Denial> {
        let verdict = self.check_execute(controller, execution);
        match &verdict {
            Ok(()) => {
                debug!(%controller, operation = ?execution.operation, target = %execution.target, "execute authorized")
            }
            Err(reason) => warn!(%controller, target = %execution.target, %reason, "execute denied"),
        }
        verdict
    }

    /// All-or-nothing: the first denied element denies the batch.
    pub fn verify_execute_batch(
        &self,
        controller: Address,
        operations: &[U256],
        targets: &[Address],
        values: &[U256],
        datas: &[Bytes],
    ) -> Result<(), Denial> {
        let len = operations.len();
        if targets.len() != len || values.len() != len || datas.len() != len {
            return Err(Denial::ParametersLengthMismatch);
        }
        if len == 0 {
            return Err(Denial::EmptyArray);
        }

        for (((operation, target), value), data) in operations.iter().zip(targets).zip(values).zip(datas) {
            let execution = Execution {
                operation: Operation::try_from(*operation)?,
                target: *target,
                value: *value,
                data: data.clone(),
            };
            self.verify_execute(controller, &execution)?;
        }
        Ok(())
    }

    fn check_execute(&self, controller: Address, execution: &Execution) -> Result<(), Denial> {
        if execution.operation == Operation::DelegateCall {
            return Err(Denial::DelegateCallDisallowed);
        }

        let permissions = self.permissions_of(controller)?;

        if execution.target == self.config.key_manager {
            return Err(Denial::CallingSelfNotAllowed);
        }

        match execution.operation {
            Operation::Create | Operation::Create2 => verify_deploy(controller, permissions, execution.value),
            Operation::StaticCall => self.verify_static_call(controller, permissions, execution),
            Operation::Call => self.verify_call(controller, permissions, execution),
            Operation::DelegateCall => Err(Denial::DelegateCallDisallowed),
        }
    }

    fn verify_static_call(
        &self,
        controller: Address,
        permissions: Permissions,
        execution: &Execution,
    ) -> Result<(), Denial> {
        if !execution.value.is_zero() {
            return Err(Denial::MsgValueDisallowedInStaticCall);
        }
        if !permissions.intersects(Permissions::ANY_CALL) {
            return Err(Denial::NoCallsAllowed { controller });
        }
        if permissions.has(Permissions::SUPER_STATICCALL) {
            return Ok(());
        }
        if !permissions.has(Permissions::STATICCALL) {
            return Err(Denial::not_authorised(controller, "STATICCALL"));
        }
        self.verify_allowed_calls(controller, execution, CallTypes::STATICCALL)
    }

    fn verify_call(
        &self,
        controller: Address,
        permissions: Permissions,
        execution: &Execution,
    ) -> Result<(), Denial> {
        let transfers_value = !execution.value.is_zero();
        let mut restricted = CallTypes::NONE;

        if transfers_value {
            if permissions.has(Permissions::SUPER_TRANSFERVALUE) {
                // unrestricted
            } else if permissions.has(Permissions::TRANSFERVALUE) {
                restricted = restricted | CallTypes::VALUE;
            } else {
                return Err(Denial::not_authorised(controller, "TRANSFERVALUE"));
            }
        }

        // a bare value transfer is not a call
        if !execution.data.is_empty() || !transfers_value {
            if !permissions.intersects(Permissions::ANY_CALL) {
                return Err(Denial::NoCallsAllowed { controller });
            }
            if permissions.has(Permissions::SUPER_CALL) {
                // unrestricted
            } else if permissions.has(Permissions::CALL) {
                restricted = restricted | CallTypes::CALL;
            } else {
                return Err(Denial::not_authorised(controller, "CALL"));
            }
        }

        if restricted == CallTypes::NONE {
            return Ok(());
        }
        self.verify_allowed_calls(controller, execution, restricted)
    }

    /// Each call type in `required` must be matched by some entry on its own.
    fn verify_allowed_calls(
        &self,
        controller: Address,
        execution: &Execution,
        required: CallTypes,
    ) -> Result<(), Denial> {
        let entries = self.registry().allowed_calls_of(controller)?;
        if entries.is_empty() {
            return Err(Denial::NoCallsAllowed { controller });
        }

        let selector = selector_of(&execution.data);
        for call_type in [CallTypes::VALUE, CallTypes::CALL, CallTypes::STATICCALL, CallTypes::DELEGATECALL] {
            if required.contains(call_type) {
                self.match_entry(controller, &entries, call_type, execution.target, selector)?;
            }
        }
        Ok(())
    }

    fn match_entry(
        &self,
        controller: Address,
        entries: &[AllowedCall],
        call_type: CallTypes,
        target: Address,
        selector: FixedBytes<4>,
    ) -> Result<(), Denial> {
        for entry in entries {
            if entry.is_zero() {
                return Err(Denial::InvalidWhitelistedCall { controller });
            }
            if entry.allows_type(call_type)
                && entry.matches_target(target)
                && entry.matches_selector(selector)
                && (entry.any_standard() || self.account.supports(target, entry.standard))
            {
                return Ok(());
            }
        }
        Err(Denial::NotAllowedCall { controller, target, selector })
    }
}

fn verify_deploy(controller: Address, permissions: Permissions, value: U256) -> Result<(), Denial> {
    require(controller, permissions, Permissions::DEPLOY)?;
    if !value.is_zero() {
        require(controller, permissions, Permissions::SUPER_TRANSFERVALUE)?;
    }
    Ok(())
}
