/// Errors raised while reading or writing the raw record framing.
///
/// Every variant that can be tied to a position carries the byte offset
/// (relative to the start of the slice handed to the reader) so that a
/// corrupt arena can be located with a hex dump.
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────────┐
/// │ Variant          │ Cause                                        │
/// ├──────────────────┼──────────────────────────────────────────────┤
/// │ VarintTooLong    │ LEB128 value did not terminate in 10 bytes   │
/// │ UnexpectedEof    │ Slice ended inside a header, varint or body  │
/// │ Misaligned       │ Record offset is not a multiple of 8         │
/// │ InvalidSize      │ byte_size smaller than the header, or the    │
/// │                  │ padded record runs past the end of the slice │
/// │ ReservedFlags    │ Reserved flag bits were not zero             │
/// └──────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Varint encoding exceeded 10 bytes without terminating.
    #[error("varint too long: exceeded 10-byte limit")]
    VarintTooLong,

    /// Input ended before a complete varint, header or body could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// A record started at an offset that is not a multiple of the
    /// alignment unit.
    #[error("record at offset {offset} is not 8-byte aligned")]
    Misaligned { offset: usize },

    /// The header's `byte_size` cannot describe a record at this position.
    #[error("invalid record size {size} at offset {offset}")]
    InvalidSize { offset: usize, size: u32 },

    /// Reserved flag bits (3..16) were non-zero.
    #[error("reserved flag bits at offset {offset} were {value:#06X}, expected 0")]
    ReservedFlags { offset: usize, value: u16 },
}
