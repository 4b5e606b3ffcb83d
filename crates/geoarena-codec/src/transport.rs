use geoarena_buffer::{Buffer, GrowthPolicy};
use geoarena_wire::WireError;
use geoarena_wire::varint::{decode_varint, push_varint};
use tracing::debug;

use crate::codec::{Codec, CodecKind, codec_for};
use crate::error::CodecError;

/// Largest committed region a frame may declare (256 MiB).
pub const MAX_FRAME_RAW_SIZE: usize = 256 * 1024 * 1024;

/// Serialize the committed records of `buffer` into a transport frame.
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────┐
/// │ varint       │ raw length of the committed region       │
/// │ u8           │ codec id (see CodecKind)                 │
/// │ [N bytes]    │ codec output                             │
/// └──────────────┴──────────────────────────────────────────┘
/// ```
///
/// In-progress bytes are never part of a frame.
///
/// # Errors
///
/// [`CodecError::Compress`] if the codec fails.
pub fn encode_buffer(buffer: &Buffer, codec: &dyn Codec) -> Result<Vec<u8>, CodecError> {
    let raw = buffer.committed_bytes();
    let packed = codec.compress(raw)?;
    let mut frame = Vec::with_capacity(packed.len() + 11);
    push_varint(&mut frame, raw.len() as u64);
    frame.push(codec.kind().wire_id());
    frame.extend_from_slice(&packed);
    debug!(
        codec = codec.kind().name(),
        raw = raw.len(),
        frame = frame.len(),
        "encoded buffer frame"
    );
    Ok(frame)
}

/// Rebuild a [`Buffer`] from a frame written by [`encode_buffer`]. The
/// inflated bytes are validated record by record before the buffer is
/// handed out.
///
/// # Errors
///
/// - [`CodecError::Truncated`] if the length prefix or codec id is missing.
/// - [`CodecError::TooLarge`] above [`MAX_FRAME_RAW_SIZE`].
/// - [`CodecError::UnknownCodec`], [`CodecError::Decompress`],
///   [`CodecError::SizeMismatch`] from the payload.
/// - [`CodecError::InvalidBuffer`] if the bytes are not well-formed records.
pub fn decode_buffer(frame: &[u8], growth: GrowthPolicy) -> Result<Buffer, CodecError> {
    let (raw_len, n) = decode_varint(frame)?;
    let raw_len = usize::try_from(raw_len)
        .ok()
        .filter(|&len| len <= MAX_FRAME_RAW_SIZE)
        .ok_or(CodecError::TooLarge {
            size: raw_len,
            limit: MAX_FRAME_RAW_SIZE,
        })?;
    let id = *frame.get(n).ok_or(WireError::UnexpectedEof { offset: n })?;
    let codec = codec_for(CodecKind::from_wire_id(id)?);
    let bytes = codec.decompress(&frame[n + 1..], raw_len)?;
    Ok(Buffer::from_committed_bytes(bytes, growth)?)
}
