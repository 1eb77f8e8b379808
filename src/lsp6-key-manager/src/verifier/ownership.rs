use alloy_primitives::Address;
use tracing::{debug, warn};

use lsp6_permission_types::Permissions;

use super::{require, PermissionVerifier};
use crate::{account::Account, errors::Denial};

/// LSP14 two-step ownership actions routed through the key manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipAction {
    TransferOwnership(Address),
    AcceptOwnership,
    RenounceOwnership,
}

impl<A: Account + ?Sized> PermissionVerifier<'_, A> {
    pub fn verify_ownership_change(
        &self,
        controller: Address,
        action: OwnershipAction,
    ) -> Result<(), Denial> {
        let verdict = self.check_ownership_change(controller, action);
        match &verdict {
            Ok(()) => debug!(%controller, ?action, "ownership change authorized"),
            Err(reason) => warn!(%controller, ?action, %reason, "ownership change denied"),
        }
        verdict
    }

    fn check_ownership_change(&self, controller: Address, action: OwnershipAction) -> Result<(), Denial> {
        match action {
            OwnershipAction::TransferOwnership(new_owner) => {
                let permissions = self.permissions_of(controller)?;
                require(controller, permissions, Permissions::CHANGEOWNER)?;
                if new_owner == self.config.account {
                    return Err(Denial::CannotTransferOwnershipToSelf);
                }
                Ok(())
            }
            OwnershipAction::RenounceOwnership => {
                let permissions = self.permissions_of(controller)?;
                require(controller, permissions, Permissions::CHANGEOWNER)
            }
            // Completing a transfer only works when the key manager is the nominated owner.
            OwnershipAction::AcceptOwnership => {
                let pending = self.account.pending_owner();
                if pending != self.config.key_manager {
                    return Err(Denial::NotPendingOwner { pending });
                }
                Ok(())
            }
        }
    }
}
