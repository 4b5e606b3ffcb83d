use geoarena_wire::WireError;

use crate::item_type::ItemType;

/// Errors raised when interpreting record bodies as typed entities.
///
/// These sit one level above [`WireError`]: the framing may be intact
/// while the body of a record is still not a valid node, tag list or
/// member list.
///
/// ```text
/// ┌─────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                              │
/// │   ├── wraps WireError for framing / varint faults   │
/// │   ├── WrongType when a view is built on a record    │
/// │   │   of another kind                               │
/// │   ├── Truncated for bodies shorter than their kind  │
/// │   ├── InvalidUtf8 for string fields                 │
/// │   ├── InvalidLocation / InvalidTimestamp for values │
/// │   └── InvalidMemberType for bad relation members    │
/// └─────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A typed view was requested for a record of a different kind.
    #[error("expected {expected} record, found {found}")]
    WrongType { expected: &'static str, found: ItemType },

    /// The record body ended before all fixed fields of its kind were read.
    #[error("{kind} body truncated at offset {offset}")]
    Truncated { kind: &'static str, offset: usize },

    /// A string field held bytes that are not UTF-8.
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    /// A coordinate was undefined or outside the valid range.
    #[error("invalid location ({x}, {y})")]
    InvalidLocation { x: i32, y: i32 },

    /// A timestamp string was neither integer seconds nor
    /// `YYYY-MM-DDTHH:MM:SSZ`.
    #[error("invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },

    /// A relation member carried a type tag that is not node, way or relation.
    #[error("invalid member type {value:#06X}")]
    InvalidMemberType { value: u16 },

    #[error(transparent)]
    Wire(#[from] WireError),
}
