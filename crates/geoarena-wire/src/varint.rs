use crate::error::WireError;

/// Maximum number of bytes a u64 varint can occupy.
/// ceil(64 / 7) = 10 bytes.
pub const MAX_VARINT_BYTES: usize = 10;

/// Encode a `u64` value as an unsigned LEB128 varint into the provided buffer.
///
/// Returns the number of bytes written (1–10).
///
/// # Panics
///
/// Panics if `buf` is shorter than the required encoding length.
/// A [`MAX_VARINT_BYTES`] buffer is always sufficient.
///
/// | Value   | Encoded bytes        | Length |
/// |---------|----------------------|--------|
/// | 0       | `[0x00]`             | 1      |
/// | 127     | `[0x7F]`             | 1      |
/// | 128     | `[0x80, 0x01]`       | 2      |
/// | 300     | `[0xAC, 0x02]`       | 2      |
/// | 16384   | `[0x80, 0x80, 0x01]` | 3      |
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf[i] = byte;
        i += 1;
        if value == 0 {
            return i;
        }
    }
}

/// Append the varint encoding of `value` to `out`.
pub fn push_varint(out: &mut Vec<u8>, value: u64) {
    let mut scratch = [0u8; MAX_VARINT_BYTES];
    let n = encode_varint(value, &mut scratch);
    out.extend_from_slice(&scratch[..n]);
}

/// Number of bytes [`encode_varint`] would produce for `value`.
#[must_use]
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Decode an unsigned LEB128 varint from the start of `buf`.
///
/// Returns `(decoded_value, bytes_consumed)`.
///
/// # Errors
///
/// - [`WireError::VarintTooLong`] if 10 bytes pass without a terminating byte.
/// - [`WireError::UnexpectedEof`] if the slice ends mid-varint.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), WireError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_BYTES {
            return Err(WireError::VarintTooLong);
        }
        result |= u64::from(byte & 0x7F) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(WireError::UnexpectedEof { offset: buf.len() })
}

/// Append a length-prefixed byte string: `varint len | bytes`.
///
/// Used for user names, tag keys and values, and member roles.
pub fn push_length_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    push_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Read a length-prefixed byte string from the start of `buf`.
///
/// Returns `(bytes, total_consumed)` where `total_consumed` includes the
/// varint prefix.
///
/// # Errors
///
/// Propagates varint errors, and returns [`WireError::UnexpectedEof`] when
/// the announced length runs past the end of `buf`.
pub fn read_length_prefixed(buf: &[u8]) -> Result<(&[u8], usize), WireError> {
    let (len, n) = decode_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| WireError::UnexpectedEof { offset: buf.len() })?;
    let end = n
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or(WireError::UnexpectedEof { offset: buf.len() })?;
    Ok((&buf[n..end], end))
}
