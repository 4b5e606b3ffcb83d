use geoarena_types::ItemType;
use geoarena_wire::WireError;

/// Errors raised by [`Buffer`](crate::Buffer) operations.
///
/// ```text
///   BufferError
///   ├── Capacity           ← write does not fit a Fixed buffer (recoverable)
///   ├── OpenBuilder        ← commit / purge / rollback / clear while a builder frame is open
///   ├── Misaligned         ← commit with the cursor off an 8-byte boundary
///   ├── InvalidMark        ← rollback to a mark from before the last commit
///   ├── NoRecordAt         ← offset outside the committed region
///   ├── RetagIncompatible  ← retag between different storage shapes
///   ├── RecordTooLarge     ← record length does not fit the u32 size field
///   └── Corrupt(WireError) ← framing error in committed bytes
/// ```
///
/// `Capacity` leaves the buffer exactly as it was before the failed
/// write, so the caller can flush, start a fresh buffer and retry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("buffer full: {requested} bytes requested, {available} available")]
    Capacity { requested: usize, available: usize },

    #[error("a builder is still open on this buffer")]
    OpenBuilder,

    #[error("in-progress region ends at unaligned offset {offset}")]
    Misaligned { offset: usize },

    #[error("mark is stale or lies beyond the write cursor")]
    InvalidMark,

    #[error("no committed record at offset {offset}")]
    NoRecordAt { offset: usize },

    #[error("cannot retag a {from} record as {to}")]
    RetagIncompatible { from: ItemType, to: ItemType },

    #[error("record of {size} bytes does not fit the size field")]
    RecordTooLarge { size: usize },

    #[error(transparent)]
    Corrupt(#[from] WireError),
}

impl BufferError {
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. })
    }
}

/// Errors raised by the [`BuilderStack`](crate::BuilderStack) protocol.
///
/// Capacity exhaustion gets its own variant so callers can tell the one
/// recoverable condition apart from protocol misuse.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuilderError {
    #[error("a record is already open on this builder")]
    AlreadyOpen,

    #[error("no record is open on this builder")]
    NotOpen,

    #[error("cannot append fields to a {kind} record after a nested record was opened")]
    FieldAfterNested { kind: ItemType },

    #[error("a {child} cannot be nested in a {parent}")]
    InvalidChild { parent: ItemType, child: ItemType },

    #[error("{kind} is not an entity kind")]
    NotAnEntity { kind: ItemType },

    #[error("buffer full: {requested} bytes requested, {available} available")]
    Capacity { requested: usize, available: usize },

    #[error(transparent)]
    Buffer(BufferError),
}

impl BuilderError {
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. })
    }
}

impl From<BufferError> for BuilderError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Capacity {
                requested,
                available,
            } => Self::Capacity {
                requested,
                available,
            },
            other => Self::Buffer(other),
        }
    }
}

impl From<WireError> for BuilderError {
    fn from(err: WireError) -> Self {
        Self::Buffer(BufferError::Corrupt(err))
    }
}
