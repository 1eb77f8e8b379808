//! Compact encodings of AllowedCalls and AllowedERC725YDataKeys values.
//!
//! AllowedCalls: `uint16 byteLength ++ (bytes1 callTypes ++ address ++ bytes4 standard ++ bytes4 selector)*`.
//! AllowedERC725YDataKeys: `(uint16 length ++ bytes prefix)*` with `1 <= length <= 32`.
//!
//! Older accounts may hold an empty value or a zero-filled word shorter than 32 bytes
//! under these keys; both decode to an empty list.

use alloc::vec::Vec;

use alloy_primitives::{hex, Bytes};

use crate::calls::{AllowedCall, ALLOWED_CALL_LEN};

/// Values this short and all-zero are legacy encodings of "nothing stored".
pub const BACKWARD_COMPAT_BOUNDARY: usize = 32;

/// Longest data-key prefix.
pub const MAX_DATA_KEY_PREFIX_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid encoded AllowedCalls: 0x{}", hex::encode(.0))]
    InvalidEncodedAllowedCalls(Bytes),
    #[error("invalid compacted AllowedERC725YDataKeys: 0x{}", hex::encode(.0))]
    InvalidCompactedAllowedDataKeys(Bytes),
    #[error("AllowedCalls list of {0} entries does not fit a uint16 length")]
    AllowedCallsTooLong(usize),
    #[error("data key prefix of {0} bytes must be between 1 and 32 bytes")]
    InvalidDataKeyPrefixLength(usize),
}

fn is_legacy_empty(value: &[u8]) -> bool {
    value.is_empty() || (value.len() < BACKWARD_COMPAT_BOUNDARY && value.iter().all(|b| *b == 0))
}

fn read_u16(value: &[u8], at: usize) -> Option<usize> {
    let bytes = value.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
}

pub fn decode_allowed_calls(value: &[u8]) -> Result<Vec<AllowedCall>, CodecError> {
    if is_legacy_empty(value) {
        return Ok(Vec::new());
    }

    let invalid = || CodecError::InvalidEncodedAllowedCalls(Bytes::copy_from_slice(value));
    let declared = read_u16(value, 0).ok_or_else(invalid)?;
    let body = &value[2..];

    if declared != body.len() || body.is_empty() || body.len() % ALLOWED_CALL_LEN != 0 {
        return Err(invalid());
    }

    Ok(body.chunks_exact(ALLOWED_CALL_LEN).map(AllowedCall::from_entry).collect())
}

pub fn encode_allowed_calls(entries: &[AllowedCall]) -> Result<Bytes, CodecError> {
    if entries.is_empty() {
        return Ok(Bytes::new());
    }

    let body_len = entries.len() * ALLOWED_CALL_LEN;
    let prefix = u16::try_from(body_len).map_err(|_| CodecError::AllowedCallsTooLong(entries.len()))?;

    let mut out = Vec::with_capacity(2 + body_len);
    out.extend_from_slice(&prefix.to_be_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.to_bytes());
    }
    Ok(out.into())
}

pub fn decode_allowed_data_keys(value: &[u8]) -> Result<Vec<Bytes>, CodecError> {
    if is_legacy_empty(value) {
        return Ok(Vec::new());
    }

    let invalid = || CodecError::InvalidCompactedAllowedDataKeys(Bytes::copy_from_slice(value));
    let mut prefixes = Vec::new();
    let mut cursor = 0;

    while cursor < value.len() {
        let len = read_u16(value, cursor).ok_or_else(invalid)?;
        if len == 0 || len > MAX_DATA_KEY_PREFIX_LEN {
            return Err(invalid());
        }
        let start = cursor + 2;
        let prefix = value.get(start..start + len).ok_or_else(invalid)?;
        prefixes.push(Bytes::copy_from_slice(prefix));
        cursor = start + len;
    }

    Ok(prefixes)
}

pub fn encode_allowed_data_keys(prefixes: &[Bytes]) -> Result<Bytes, CodecError> {
    let mut out = Vec::new();
    for prefix in prefixes {
        if prefix.is_empty() || prefix.len() > MAX_DATA_KEY_PREFIX_LEN {
            return Err(CodecError::InvalidDataKeyPrefixLength(prefix.len()));
        }
        out.extend_from_slice(&(prefix.len() as u16).to_be_bytes());
        out.extend_from_slice(prefix);
    }
    Ok(out.into())
}
