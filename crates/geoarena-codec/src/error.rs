use geoarena_buffer::BufferError;
use geoarena_wire::WireError;

/// Errors raised while compressing buffers or decoding transport frames.
///
/// ```text
///   CodecError
///   ├── Compress          ← the compressor itself failed
///   ├── Decompress        ← corrupt or truncated compressed stream
///   ├── SizeMismatch      ← stream inflated to a different length
///   ├── UnknownCodec      ← frame names a codec id we don't know
///   ├── TooLarge          ← declared raw length above the frame limit
///   ├── Truncated         ← frame prefix cut short (WireError)
///   └── InvalidBuffer     ← inflated bytes are not valid records
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("{codec} compression failed: {reason}")]
    Compress { codec: &'static str, reason: String },

    #[error("{codec} decompression failed: {reason}")]
    Decompress { codec: &'static str, reason: String },

    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("unknown codec id {id:#04X}")]
    UnknownCodec { id: u8 },

    #[error("declared size {size} exceeds the {limit} byte frame limit")]
    TooLarge { size: u64, limit: usize },

    #[error(transparent)]
    Truncated(#[from] WireError),

    #[error(transparent)]
    InvalidBuffer(#[from] BufferError),
}
