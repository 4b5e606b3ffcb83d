use crate::align::{is_aligned, padded_length};
use crate::error::WireError;

/// Size of the fixed header at the start of every record.
pub const RECORD_HEADER_SIZE: usize = 8;

/// The 2-bit diff indicator stored in bits 1-2 of the record flags.
///
/// Used by diff-style consumers to mark which side of a comparison a
/// record belongs to.
///
/// ```text
/// ┌──────┬─────────┬──────┐
/// │ Bits │ Variant │ Char │
/// ├──────┼─────────┼──────┤
/// │ 0b00 │ None    │ '*'  │
/// │ 0b01 │ Left    │ '-'  │
/// │ 0b10 │ Right   │ '+'  │
/// │ 0b11 │ Both    │ ' '  │
/// └──────┴─────────┴──────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DiffIndicator {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl DiffIndicator {
    /// Decode the two low bits of `bits`. Higher bits are ignored.
    #[must_use]
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => Self::None,
            1 => Self::Left,
            2 => Self::Right,
            _ => Self::Both,
        }
    }

    #[must_use]
    pub fn bits(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Left => 1,
            Self::Right => 2,
            Self::Both => 3,
        }
    }

    /// Single-character marker used in textual diff output.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::None => '*',
            Self::Left => '-',
            Self::Right => '+',
            Self::Both => ' ',
        }
    }
}

/// Per-record flags bitfield.
///
/// Bit layout:
///   bit 0 = removed (record is logically deleted, skipped by purge)
///   bits 1-2 = diff indicator, see [`DiffIndicator`]
///   bits 3-15 = reserved (MUST be 0)
///
/// Both the removed bit and the diff indicator may be changed after the
/// record has been committed; nothing else about a committed record may.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RecordFlags(u16);

impl RecordFlags {
    pub const NONE: Self = Self(0);
    pub const REMOVED: Self = Self(0b0000_0001);

    const DIFF_MASK: u16 = 0b0000_0110;
    const DIFF_SHIFT: u32 = 1;

    /// Every bit that is not assigned a meaning.
    pub const RESERVED_MASK: u16 = !0b0000_0111;

    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn is_removed(self) -> bool {
        self.0 & Self::REMOVED.0 != 0
    }

    pub fn set_removed(&mut self, removed: bool) {
        if removed {
            self.0 |= Self::REMOVED.0;
        } else {
            self.0 &= !Self::REMOVED.0;
        }
    }

    #[must_use]
    pub fn with_removed(mut self, removed: bool) -> Self {
        self.set_removed(removed);
        self
    }

    #[must_use]
    pub fn diff(self) -> DiffIndicator {
        DiffIndicator::from_bits((self.0 & Self::DIFF_MASK) >> Self::DIFF_SHIFT)
    }

    pub fn set_diff(&mut self, diff: DiffIndicator) {
        self.0 = (self.0 & !Self::DIFF_MASK) | (diff.bits() << Self::DIFF_SHIFT);
    }

    #[must_use]
    pub fn with_diff(mut self, diff: DiffIndicator) -> Self {
        self.set_diff(diff);
        self
    }

    #[must_use]
    pub fn has_reserved_bits(self) -> bool {
        self.0 & Self::RESERVED_MASK != 0
    }
}

/// Record header: the first 8 bytes of every record in an arena.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────────────┐
/// │ Offset │ Size    │ Description                              │
/// ├────────┼─────────┼──────────────────────────────────────────┤
/// │ 0x00   │ 4 bytes │ byte_size (u32 LE), header included,     │
/// │        │         │ trailing padding excluded                │
/// │ 0x04   │ 2 bytes │ type_tag (u16 LE)                        │
/// │ 0x06   │ 2 bytes │ flags (u16 LE), see [`RecordFlags`]      │
/// └────────┴─────────┴──────────────────────────────────────────┘
/// ```
///
/// A header alone is a valid (empty) record, so the smallest legal
/// `byte_size` is [`RECORD_HEADER_SIZE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub byte_size: u32,
    pub type_tag: u16,
    pub flags: RecordFlags,
}

impl RecordHeader {
    /// A header for an empty record of the given type. The builder
    /// overwrites `byte_size` when the record is closed.
    #[must_use]
    pub fn new(type_tag: u16) -> Self {
        Self {
            byte_size: RECORD_HEADER_SIZE as u32,
            type_tag,
            flags: RecordFlags::NONE,
        }
    }

    /// `byte_size` rounded up to the alignment unit: the distance to the
    /// next record.
    #[must_use]
    pub fn padded_size(&self) -> usize {
        padded_length(self.byte_size as usize)
    }

    /// Write the 8-byte header into the start of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`RECORD_HEADER_SIZE`].
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), WireError> {
        if buf.len() < RECORD_HEADER_SIZE {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }

        buf[0..4].copy_from_slice(&self.byte_size.to_le_bytes());
        buf[4..6].copy_from_slice(&self.type_tag.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.raw().to_le_bytes());

        Ok(())
    }

    /// Parse a header from the first 8 bytes of `buf`.
    ///
    /// Only the header itself is validated here; use [`read_at`](Self::read_at)
    /// to also check that the record fits in the surrounding slice.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if `buf` is too short.
    /// - [`WireError::InvalidSize`] if `byte_size` is below the header size.
    /// - [`WireError::ReservedFlags`] if reserved flag bits are set.
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < RECORD_HEADER_SIZE {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }

        let byte_size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let type_tag = u16::from_le_bytes([buf[4], buf[5]]);
        let flags = RecordFlags::from_raw(u16::from_le_bytes([buf[6], buf[7]]));

        if (byte_size as usize) < RECORD_HEADER_SIZE {
            return Err(WireError::InvalidSize {
                offset: 0,
                size: byte_size,
            });
        }

        if flags.has_reserved_bits() {
            return Err(WireError::ReservedFlags {
                offset: 6,
                value: flags.raw(),
            });
        }

        Ok(Self {
            byte_size,
            type_tag,
            flags,
        })
    }

    /// Parse the header of the record starting at `offset` inside `buf`
    /// and check that the whole padded record lies within `buf`.
    ///
    /// Error offsets are reported relative to the start of `buf`.
    ///
    /// # Errors
    ///
    /// [`WireError::Misaligned`] for an unaligned `offset`, plus everything
    /// [`read_from`](Self::read_from) reports, plus
    /// [`WireError::InvalidSize`] when the padded record overruns `buf`.
    pub fn read_at(buf: &[u8], offset: usize) -> Result<Self, WireError> {
        if !is_aligned(offset) {
            return Err(WireError::Misaligned { offset });
        }
        let rest = buf
            .get(offset..)
            .ok_or(WireError::UnexpectedEof { offset: buf.len() })?;

        let header = Self::read_from(rest).map_err(|e| match e {
            WireError::UnexpectedEof { offset: o } => WireError::UnexpectedEof { offset: offset + o },
            WireError::InvalidSize { size, .. } => WireError::InvalidSize { offset, size },
            WireError::ReservedFlags { value, .. } => WireError::ReservedFlags {
                offset: offset + 6,
                value,
            },
            other => other,
        })?;

        if header.padded_size() > rest.len() {
            return Err(WireError::InvalidSize {
                offset,
                size: header.byte_size,
            });
        }

        Ok(header)
    }

    /// Overwrite only the `byte_size` field of the header at the start
    /// of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than 4 bytes.
    pub fn patch_byte_size(buf: &mut [u8], byte_size: u32) -> Result<(), WireError> {
        let slot = buf
            .get_mut(0..4)
            .ok_or(WireError::UnexpectedEof { offset: 0 })?;
        slot.copy_from_slice(&byte_size.to_le_bytes());
        Ok(())
    }

    /// Overwrite only the flags field of the header at the start of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than the header.
    pub fn patch_flags(buf: &mut [u8], flags: RecordFlags) -> Result<(), WireError> {
        let len = buf.len();
        let slot = buf
            .get_mut(6..8)
            .ok_or(WireError::UnexpectedEof { offset: len })?;
        slot.copy_from_slice(&flags.raw().to_le_bytes());
        Ok(())
    }

    /// Overwrite only the type tag of the header at the start of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than 6 bytes.
    pub fn patch_type_tag(buf: &mut [u8], type_tag: u16) -> Result<(), WireError> {
        let len = buf.len();
        let slot = buf
            .get_mut(4..6)
            .ok_or(WireError::UnexpectedEof { offset: len })?;
        slot.copy_from_slice(&type_tag.to_le_bytes());
        Ok(())
    }
}
