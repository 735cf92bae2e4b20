//! Canonical unsigned LEB128 for protocol codes and length prefixes.
//!
//! Wire compatibility is delegated to `unsigned-varint`; this module pins
//! down the multiaddr rules: at most nine bytes (63 bits of payload) and
//! minimal encodings only, so that every value has exactly one byte form.

use unsigned_varint::{decode, encode};

use crate::errors::ParseError;

/// Decode a varint from the front of `buf`, returning the value and the
/// remaining bytes.
pub(crate) fn decode_u64(buf: &[u8]) -> Result<(u64, &[u8]), ParseError> {
    decode::u64(buf).map_err(|e| match e {
        decode::Error::Insufficient => ParseError::VarintTruncated,
        decode::Error::NotMinimal => ParseError::NonMinimalVarint,
        _ => ParseError::VarintOverflow,
    })
}

/// Append the minimal encoding of `value` to `out`.
pub(crate) fn encode_u64(value: u64, out: &mut Vec<u8>) {
    let mut buf = encode::u64_buffer();
    out.extend_from_slice(encode::u64(value, &mut buf));
}
