use core::{
    fmt,
    ops::{BitAnd, BitOr, BitOrAssign},
};

use alloy_primitives::{B256, U256};

/// A controller's 256-bit permission mask.
///
/// Bits are granted with `|` and tested with [`Permissions::has`]. The all-zero mask is the
/// "no permissions registered" state.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Permissions(pub U256);

const fn bit(value: u64) -> Permissions {
    Permissions(U256::from_limbs([value, 0, 0, 0]))
}

impl Permissions {
    pub const NONE: Self = Permissions(U256::ZERO);

    pub const CHANGEOWNER: Self = bit(0x1);
    pub const ADDPERMISSIONS: Self = bit(0x2);
    pub const CHANGEPERMISSIONS: Self = bit(0x4);
    pub const ADDEXTENSIONS: Self = bit(0x8);
    pub const CHANGEEXTENSIONS: Self = bit(0x10);
    pub const ADDUNIVERSALRECEIVERDELEGATE: Self = bit(0x20);
    pub const CHANGEUNIVERSALRECEIVERDELEGATE: Self = bit(0x40);
    pub const REENTRANCY: Self = bit(0x80);
    pub const SUPER_TRANSFERVALUE: Self = bit(0x100);
    pub const TRANSFERVALUE: Self = bit(0x200);
    pub const SUPER_CALL: Self = bit(0x400);
    pub const CALL: Self = bit(0x800);
    pub const SUPER_STATICCALL: Self = bit(0x1000);
    pub const STATICCALL: Self = bit(0x2000);
    pub const SUPER_DELEGATECALL: Self = bit(0x4000);
    pub const DELEGATECALL: Self = bit(0x8000);
    pub const DEPLOY: Self = bit(0x10000);
    pub const SUPER_SETDATA: Self = bit(0x20000);
    pub const SETDATA: Self = bit(0x40000);
    pub const ENCRYPT: Self = bit(0x80000);
    pub const DECRYPT: Self = bit(0x100000);
    pub const SIGN: Self = bit(0x200000);
    pub const EXECUTE_RELAY_CALL: Self = bit(0x400000);

    /// Legacy name of [`Permissions::ADDPERMISSIONS`].
    pub const ADDCONTROLLER: Self = Self::ADDPERMISSIONS;
    /// Legacy name of [`Permissions::CHANGEPERMISSIONS`].
    pub const EDITPERMISSIONS: Self = Self::CHANGEPERMISSIONS;

    /// Every defined permission bit.
    pub const ALL_PERMISSIONS: Self = bit(0x7f_ffff);

    /// Every call-type permission (regular and SUPER variants).
    pub const ANY_CALL: Self = bit(0x400 | 0x800 | 0x1000 | 0x2000 | 0x4000 | 0x8000);

    /// Decode a stored permission value.
    ///
    /// The value is read as a left-aligned `bytes32`: shorter values are right-padded with
    /// zeros and anything past 32 bytes is ignored.
    pub fn from_value(value: &[u8]) -> Self {
        let mut word = [0u8; 32];
        let len = value.len().min(32);
        word[..len].copy_from_slice(&value[..len]);
        Permissions(U256::from_be_bytes(word))
    }

    pub fn to_b256(self) -> B256 {
        B256::from(self.0.to_be_bytes::<32>())
    }

    pub fn is_empty(self) -> bool {
        self.0.is_zero()
    }

    /// `(mask & required) == required`.
    pub fn has(self, required: Permissions) -> bool {
        self.0 & required.0 == required.0
    }

    /// True when at least one bit of `other` is held.
    pub fn intersects(self, other: Permissions) -> bool {
        !(self.0 & other.0).is_zero()
    }

    pub fn grant(self, other: Permissions) -> Self {
        self | other
    }

    /// Bits of `required` that are not held.
    pub fn missing(self, required: Permissions) -> Self {
        Permissions(required.0 & !self.0)
    }

    /// Canonical name of the lowest defined bit set in `self`.
    pub fn name(self) -> &'static str {
        PERMISSION_NAMES
            .iter()
            .find(|(bit, _)| self.intersects(*bit))
            .map(|(_, name)| *name)
            .unwrap_or("UNKNOWN")
    }

    /// Names of all defined bits held, lowest first.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        PERMISSION_NAMES
            .iter()
            .filter(move |(bit, _)| self.has(*bit))
            .map(|(_, name)| *name)
    }
}

pub const PERMISSION_NAMES: [(Permissions, &str); 23] = [
    (Permissions::CHANGEOWNER, "CHANGEOWNER"),
    (Permissions::ADDPERMISSIONS, "ADDPERMISSIONS"),
    (Permissions::CHANGEPERMISSIONS, "CHANGEPERMISSIONS"),
    (Permissions::ADDEXTENSIONS, "ADDEXTENSIONS"),
    (Permissions::CHANGEEXTENSIONS, "CHANGEEXTENSIONS"),
    (Permissions::ADDUNIVERSALRECEIVERDELEGATE, "ADDUNIVERSALRECEIVERDELEGATE"),
    (Permissions::CHANGEUNIVERSALRECEIVERDELEGATE, "CHANGEUNIVERSALRECEIVERDELEGATE"),
    (Permissions::REENTRANCY, "REENTRANCY"),
    (Permissions::SUPER_TRANSFERVALUE, "SUPER_TRANSFERVALUE"),
    (Permissions::TRANSFERVALUE, "TRANSFERVALUE"),
    (Permissions::SUPER_CALL, "SUPER_CALL"),
    (Permissions::CALL, "CALL"),
    (Permissions::SUPER_STATICCALL, "SUPER_STATICCALL"),
    (Permissions::STATICCALL, "STATICCALL"),
    (Permissions::SUPER_DELEGATECALL, "SUPER_DELEGATECALL"),
    (Permissions::DELEGATECALL, "DELEGATECALL"),
    (Permissions::DEPLOY, "DEPLOY"),
    (Permissions::SUPER_SETDATA, "SUPER_SETDATA"),
    (Permissions::SETDATA, "SETDATA"),
    (Permissions::ENCRYPT, "ENCRYPT"),
    (Permissions::DECRYPT, "DECRYPT"),
    (Permissions::SIGN, "SIGN"),
    (Permissions::EXECUTE_RELAY_CALL, "EXECUTE_RELAY_CALL"),
];

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Permissions(self.0 & rhs.0)
    }
}

impl From<B256> for Permissions {
    fn from(word: B256) -> Self {
        Permissions(U256::from_be_bytes(word.0))
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Permissions").field(&format_args!("{:#x}", self.0)).finish()
    }
}
