use crate::error::TypeError;
use crate::location::{Bounds, Location, LOCATION_SIZE};
use crate::timestamp::Timestamp;

/// Encoded size of [`ObjectFields`].
pub const OBJECT_FIELDS_SIZE: usize = 32;

/// Encoded size of [`ChangesetFields`].
pub const CHANGESET_FIELDS_SIZE: usize = 40;

/// Bit in the object-bits word marking a visible (not deleted) object.
pub const VISIBLE_BIT: u32 = 0b1;

/// Fixed fields shared by nodes, ways and relations.
///
/// ```text
/// ┌────────┬─────────┬─────────────────────────────┐
/// │ Offset │ Size    │ Field                       │
/// ├────────┼─────────┼─────────────────────────────┤
/// │ 0x00   │ 8 bytes │ id (i64)                    │
/// │ 0x08   │ 4 bytes │ version (u32)               │
/// │ 0x0C   │ 4 bytes │ changeset (u32)             │
/// │ 0x10   │ 4 bytes │ timestamp (u32 seconds)     │
/// │ 0x14   │ 4 bytes │ uid (u32)                   │
/// │ 0x18   │ 4 bytes │ object bits (bit 0 visible) │
/// │ 0x1C   │ 4 bytes │ reserved (0)                │
/// └────────┴─────────┴─────────────────────────────┘
/// ```
///
/// Offsets are relative to the start of the record body, right after
/// the 8-byte record header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectFields {
    pub id: i64,
    pub version: u32,
    pub changeset: u32,
    pub timestamp: Timestamp,
    pub uid: u32,
    pub visible: bool,
}

impl ObjectFields {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let bits = if self.visible { VISIBLE_BIT } else { 0 };
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.changeset.to_le_bytes());
        out.extend_from_slice(&self.timestamp.seconds().to_le_bytes());
        out.extend_from_slice(&self.uid.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
    }

    /// # Errors
    ///
    /// Returns [`TypeError::Truncated`] if `buf` holds fewer than
    /// [`OBJECT_FIELDS_SIZE`] bytes.
    pub fn read_from(buf: &[u8]) -> Result<Self, TypeError> {
        if buf.len() < OBJECT_FIELDS_SIZE {
            return Err(TypeError::Truncated {
                kind: "object fields",
                offset: buf.len(),
            });
        }
        Ok(Self {
            id: read_i64(buf, 0),
            version: read_u32(buf, 8),
            changeset: read_u32(buf, 12),
            timestamp: Timestamp::from_seconds(read_u32(buf, 16)),
            uid: read_u32(buf, 20),
            visible: read_u32(buf, 24) & VISIBLE_BIT != 0,
        })
    }
}

impl Default for ObjectFields {
    fn default() -> Self {
        Self {
            id: 0,
            version: 0,
            changeset: 0,
            timestamp: Timestamp::default(),
            uid: 0,
            visible: true,
        }
    }
}

/// Fixed fields of a changeset record.
///
/// ```text
/// ┌────────┬──────────┬──────────────────────────────────┐
/// │ Offset │ Size     │ Field                            │
/// ├────────┼──────────┼──────────────────────────────────┤
/// │ 0x00   │ 8 bytes  │ id (i64)                         │
/// │ 0x08   │ 4 bytes  │ created_at (u32 seconds)         │
/// │ 0x0C   │ 4 bytes  │ closed_at (u32 seconds, 0=open)  │
/// │ 0x10   │ 4 bytes  │ num_changes (u32)                │
/// │ 0x14   │ 4 bytes  │ uid (u32)                        │
/// │ 0x18   │ 16 bytes │ bounds: min x, min y, max x,     │
/// │        │          │ max y (i32 each)                 │
/// └────────┴──────────┴──────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangesetFields {
    pub id: i64,
    pub created_at: Timestamp,
    pub closed_at: Timestamp,
    pub num_changes: u32,
    pub uid: u32,
    pub bounds: Bounds,
}

impl ChangesetFields {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed_at.is_set()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.created_at.seconds().to_le_bytes());
        out.extend_from_slice(&self.closed_at.seconds().to_le_bytes());
        out.extend_from_slice(&self.num_changes.to_le_bytes());
        out.extend_from_slice(&self.uid.to_le_bytes());
        self.bounds.bottom_left().write_to(out);
        self.bounds.top_right().write_to(out);
    }

    /// # Errors
    ///
    /// Returns [`TypeError::Truncated`] if `buf` holds fewer than
    /// [`CHANGESET_FIELDS_SIZE`] bytes.
    pub fn read_from(buf: &[u8]) -> Result<Self, TypeError> {
        if buf.len() < CHANGESET_FIELDS_SIZE {
            return Err(TypeError::Truncated {
                kind: "changeset fields",
                offset: buf.len(),
            });
        }
        let bottom_left = Location::read_from(&buf[24..24 + LOCATION_SIZE])?;
        let top_right = Location::read_from(&buf[32..32 + LOCATION_SIZE])?;
        Ok(Self {
            id: read_i64(buf, 0),
            created_at: Timestamp::from_seconds(read_u32(buf, 8)),
            closed_at: Timestamp::from_seconds(read_u32(buf, 12)),
            num_changes: read_u32(buf, 16),
            uid: read_u32(buf, 20),
            bounds: Bounds::new(bottom_left, top_right),
        })
    }
}

// Callers check the length up front.
fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_i64(buf: &[u8], at: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    i64::from_le_bytes(raw)
}
