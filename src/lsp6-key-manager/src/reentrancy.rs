//! Re-entry control for nested key manager invocations.

use core::cell::Cell;

use alloy_primitives::Address;
use tracing::trace;

use lsp6_permission_types::Permissions;

use crate::errors::Denial;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    /// A call is in flight, entered by this controller.
    Active(Address),
}

#[derive(Debug)]
pub struct ReentrancyGuard {
    state: Cell<GuardState>,
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::with_state(GuardState::Idle)
    }

    /// Start from a known state, e.g. one persisted across contract invocations.
    pub fn with_state(state: GuardState) -> Self {
        Self { state: Cell::new(state) }
    }

    pub fn state(&self) -> GuardState {
        self.state.get()
    }

    /// Enter a guarded section. A nested entry needs `REENTRANCY` whatever else the caller holds.
    pub fn enter(&self, caller: Address, permissions: Permissions) -> Result<ReentrancyScope<'_>, Denial> {
        match self.state.get() {
            GuardState::Idle => {
                self.state.set(GuardState::Active(caller));
                trace!(%caller, "guard entered");
                Ok(ReentrancyScope { guard: self, outermost: true })
            }
            GuardState::Active(entered_by) => {
                if !permissions.has(Permissions::REENTRANCY) {
                    return Err(Denial::not_authorised(caller, "REENTRANCY"));
                }
                trace!(%caller, %entered_by, "guard re-entered");
                Ok(ReentrancyScope { guard: self, outermost: false })
            }
        }
    }
}

/// Restores `Idle` on drop when it opened the outermost section.
#[must_use]
#[derive(Debug)]
pub struct ReentrancyScope<'a> {
    guard: &'a ReentrancyGuard,
    outermost: bool,
}

impl ReentrancyScope<'_> {
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for ReentrancyScope<'_> {
    fn drop(&mut self) {
        if self.outermost {
            self.guard.state.set(GuardState::Idle);
            trace!("guard released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1");
    const BOB: Address = address!("b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0");

    #[test]
    fn outermost_scope_restores_idle() {
        let guard = ReentrancyGuard::new();
        {
            let scope = guard.enter(ALICE, Permissions::CALL).unwrap();
            assert!(scope.is_outermost());
            assert_eq!(guard.state(), GuardState::Active(ALICE));
        }
        assert_eq!(guard.state(), GuardState::Idle);
    }

    #[test]
    fn nested_entry_requires_reentrancy() {
        let guard = ReentrancyGuard::new();
        let _outer = guard.enter(ALICE, Permissions::ALL_PERMISSIONS).unwrap();

        let all_but_reentrancy = Permissions(Permissions::ALL_PERMISSIONS.0 ^ Permissions::REENTRANCY.0);
        assert_eq!(
            guard.enter(BOB, all_but_reentrancy).err(),
            Some(Denial::NotAuthorised { controller: BOB, permission: "REENTRANCY" })
        );

        {
            let inner = guard.enter(BOB, Permissions::REENTRANCY).unwrap();
            assert!(!inner.is_outermost());
        }
        // inner scope does not release the outer one
        assert_eq!(guard.state(), GuardState::Active(ALICE));
    }

    #[test]
    fn persisted_active_state_is_honoured() {
        let guard = ReentrancyGuard::with_state(GuardState::Active(Address::ZERO));
        assert!(guard.enter(ALICE, Permissions::SUPER_CALL).is_err());
        let scope = guard.enter(ALICE, Permissions::REENTRANCY).unwrap();
        drop(scope);
        assert_eq!(guard.state(), GuardState::Active(Address::ZERO));
    }
}
