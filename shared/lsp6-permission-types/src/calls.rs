use alloy_primitives::{Address, FixedBytes};

/// Call-type restriction bits of an AllowedCalls entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CallTypes(pub u8);

impl CallTypes {
    pub const NONE: Self = CallTypes(0);
    pub const VALUE: Self = CallTypes(0x01);
    pub const CALL: Self = CallTypes(0x02);
    pub const STATICCALL: Self = CallTypes(0x04);
    pub const DELEGATECALL: Self = CallTypes(0x08);
    pub const ANY: Self = CallTypes(0xff);

    pub fn contains(self, other: CallTypes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: CallTypes) -> Self {
        CallTypes(self.0 | other.0)
    }
}

impl core::ops::BitOr for CallTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

pub const ANY_ADDRESS: Address = Address::repeat_byte(0xff);
pub const ANY_STANDARD: FixedBytes<4> = FixedBytes([0xff; 4]);
pub const ANY_SELECTOR: FixedBytes<4> = FixedBytes([0xff; 4]);

/// Encoded width of one [`AllowedCall`]: `bytes1 ++ address ++ bytes4 ++ bytes4`.
pub const ALLOWED_CALL_LEN: usize = 29;

/// One entry of a controller's AllowedCalls list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AllowedCall {
    pub call_types: CallTypes,
    pub target: Address,
    /// ERC165 interface id the target must support.
    pub standard: FixedBytes<4>,
    pub selector: FixedBytes<4>,
}

impl AllowedCall {
    pub fn new(
        call_types: CallTypes,
        target: Address,
        standard: FixedBytes<4>,
        selector: FixedBytes<4>,
    ) -> Self {
        Self { call_types, target, standard, selector }
    }

    /// Any target, any standard, any selector, for the given call types.
    pub fn unrestricted(call_types: CallTypes) -> Self {
        Self::new(call_types, ANY_ADDRESS, ANY_STANDARD, ANY_SELECTOR)
    }

    /// Target, standard and selector all zero. Never authorizes anything.
    pub fn is_zero(&self) -> bool {
        self.target == Address::ZERO
            && self.standard == FixedBytes::ZERO
            && self.selector == FixedBytes::ZERO
    }

    pub fn allows_type(&self, required: CallTypes) -> bool {
        self.call_types.contains(required)
    }

    pub fn matches_target(&self, target: Address) -> bool {
        self.target == ANY_ADDRESS || self.target == target
    }

    pub fn any_standard(&self) -> bool {
        self.standard == ANY_STANDARD
    }

    pub fn matches_selector(&self, selector: FixedBytes<4>) -> bool {
        self.selector == ANY_SELECTOR || self.selector == selector
    }

    pub fn to_bytes(&self) -> [u8; ALLOWED_CALL_LEN] {
        let mut out = [0u8; ALLOWED_CALL_LEN];
        out[0] = self.call_types.0;
        out[1..21].copy_from_slice(self.target.as_slice());
        out[21..25].copy_from_slice(self.standard.as_slice());
        out[25..29].copy_from_slice(self.selector.as_slice());
        out
    }

    /// Caller guarantees `bytes.len() == ALLOWED_CALL_LEN`.
    pub(crate) fn from_entry(bytes: &[u8]) -> Self {
        Self {
            call_types: CallTypes(bytes[0]),
            target: Address::from_slice(&bytes[1..21]),
            standard: FixedBytes::from_slice(&bytes[21..25]),
            selector: FixedBytes::from_slice(&bytes[25..29]),
        }
    }
}

/// First four bytes of `data`, zero-padded when shorter.
pub fn selector_of(data: &[u8]) -> FixedBytes<4> {
    let mut selector = [0u8; 4];
    let len = data.len().min(4);
    selector[..len].copy_from_slice(&data[..len]);
    FixedBytes(selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, fixed_bytes};

    #[test]
    fn wildcard_entry_matches_everything() {
        let entry = AllowedCall::unrestricted(CallTypes::CALL | CallTypes::VALUE);
        assert!(entry.matches_target(address!("1111111111111111111111111111111111111111")));
        assert!(entry.matches_selector(fixed_bytes!("a9059cbb")));
        assert!(entry.any_standard());
        assert!(entry.allows_type(CallTypes::VALUE));
        assert!(!entry.allows_type(CallTypes::STATICCALL));
    }

    #[test]
    fn zero_entry_is_detected() {
        let entry = AllowedCall::new(CallTypes::ANY, Address::ZERO, FixedBytes::ZERO, FixedBytes::ZERO);
        assert!(entry.is_zero());
        assert!(!AllowedCall::unrestricted(CallTypes::ANY).is_zero());
    }

    #[test]
    fn selector_is_zero_padded() {
        assert_eq!(selector_of(&[]), FixedBytes::<4>::ZERO);
        assert_eq!(selector_of(&[0xab, 0xcd]), fixed_bytes!("abcd0000"));
        assert_eq!(selector_of(&[1, 2, 3, 4, 5]), fixed_bytes!("01020304"));
    }
}
