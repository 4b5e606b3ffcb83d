use std::io;
use std::sync::Arc;

use geoarena_buffer::{BufferError, BuilderError};
use geoarena_codec::CodecError;
use geoarena_types::ItemType;

/// Errors surfaced to consumers of a pipeline.
///
/// ```text
///   PipelineError
///   ├── Format            ← decoder produced malformed input or events
///   ├── Capacity          ← one entity does not fit an empty buffer
///   ├── UnsupportedFormat ← no decoder registered for the format
///   ├── Codec             ← a blob failed to decompress
///   ├── Buffer            ← a buffer rejected an edit
///   ├── Build             ← builder protocol violation
///   ├── Io                ← reading the input failed
///   ├── WorkerPanicked    ← a pool task or the producer panicked
///   └── Disconnected      ← the other side went away before answering
/// ```
///
/// The type is `Clone` because one error may be reported twice: once
/// through the header signal and once as the last queue element.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("format error at event {position}: {message}")]
    Format { message: String, position: u64 },

    #[error("{kind} {id} does not fit an empty buffer of {capacity} bytes")]
    Capacity {
        capacity: usize,
        kind: ItemType,
        id: i64,
    },

    #[error("unsupported format '{format}', available: [{available}]")]
    UnsupportedFormat { format: String, available: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Build(#[from] BuilderError),

    #[error("i/o error: {0}")]
    Io(Arc<io::Error>),

    #[error("worker panicked: {message}")]
    WorkerPanicked { message: String },

    #[error("the other side of the pipeline disconnected")]
    Disconnected,
}

impl PipelineError {
    pub(crate) fn format(message: impl Into<String>, position: u64) -> Self {
        Self::Format {
            message: message.into(),
            position,
        }
    }

    /// Whether this is the recoverable "buffer full" condition raised by
    /// a `Fixed` buffer, as opposed to the terminal [`Self::Capacity`].
    #[must_use]
    pub fn is_buffer_full(&self) -> bool {
        match self {
            Self::Build(err) => err.is_capacity(),
            Self::Buffer(err) => err.is_capacity(),
            _ => false,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<crate::oneshot::Disconnected> for PipelineError {
    fn from(_: crate::oneshot::Disconnected) -> Self {
        Self::Disconnected
    }
}
