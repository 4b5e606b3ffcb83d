use geoarena_wire::{DiffIndicator, RecordFlags, RecordHeader, WireError, RECORD_HEADER_SIZE};

use crate::item_type::ItemType;

/// A borrowed view of one record inside an arena.
///
/// `offset` is the position of the record relative to the start of the
/// arena it was read from; it is the record's identity. `bytes` covers
/// exactly `byte_size` bytes (header included, padding excluded).
#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    offset: usize,
    header: RecordHeader,
    bytes: &'a [u8],
}

impl<'a> Record<'a> {
    /// Parse the record at `pos` inside `buf`. `base` is the offset of
    /// `buf` within the enclosing arena and is added to the reported
    /// record offset.
    ///
    /// # Errors
    ///
    /// Propagates [`RecordHeader::read_at`] failures.
    pub fn parse(buf: &'a [u8], pos: usize, base: usize) -> Result<Self, WireError> {
        let header = RecordHeader::read_at(buf, pos)?;
        let bytes = &buf[pos..pos + header.byte_size as usize];
        Ok(Self {
            offset: base + pos,
            header,
            bytes,
        })
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn header(&self) -> RecordHeader {
        self.header
    }

    #[must_use]
    pub fn item_type(&self) -> ItemType {
        ItemType::from_wire_id(self.header.type_tag)
    }

    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.header.byte_size as usize
    }

    #[must_use]
    pub fn padded_size(&self) -> usize {
        self.header.padded_size()
    }

    #[must_use]
    pub fn flags(&self) -> RecordFlags {
        self.header.flags
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.header.flags.is_removed()
    }

    #[must_use]
    pub fn diff(&self) -> DiffIndicator {
        self.header.flags.diff()
    }

    /// Header and body, without trailing padding.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Everything after the 8-byte header.
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[RECORD_HEADER_SIZE..]
    }

    /// Iterate the sub-records that start `start` bytes into this record.
    /// `start` must be aligned relative to the record.
    #[must_use]
    pub fn children_from(&self, start: usize) -> RecordIter<'a> {
        let region = self.bytes.get(start..).unwrap_or(&[]);
        RecordIter::new(region, self.offset + start)
    }
}

/// Iterator over consecutive records in a region.
///
/// Steps by each record's padded size from the start of the region and
/// stops at its end. The iterator is lazy, finite, and can be recreated
/// at any time to walk the same region again. A malformed header ends
/// iteration; regions produced by the builder or accepted by
/// [`validate_records`] never contain one.
#[derive(Clone, Debug)]
pub struct RecordIter<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> RecordIter<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(&[], 0)
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        if self.pos >= self.buf.len() {
            return None;
        }
        match Record::parse(self.buf, self.pos, self.base) {
            Ok(record) => {
                self.pos += record.padded_size();
                Some(record)
            }
            Err(_) => {
                self.pos = self.buf.len();
                None
            }
        }
    }
}

/// Check that `buf` is a gap-free sequence of well-formed records that
/// ends exactly on a record boundary. Returns the number of records.
///
/// # Errors
///
/// The first [`WireError`] found, with offsets relative to `buf`.
pub fn validate_records(buf: &[u8]) -> Result<usize, WireError> {
    let mut pos = 0;
    let mut count = 0;
    while pos < buf.len() {
        let header = RecordHeader::read_at(buf, pos)?;
        pos += header.padded_size();
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoarena_wire::item_type;

    fn record_bytes(type_tag: u16, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; RECORD_HEADER_SIZE];
        let header = RecordHeader {
            byte_size: (RECORD_HEADER_SIZE + body.len()) as u32,
            type_tag,
            flags: RecordFlags::NONE,
        };
        header.write_to(&mut out).unwrap();
        out.extend_from_slice(body);
        out.resize(geoarena_wire::padded_length(out.len()), 0);
        out
    }

    #[test]
    fn iterate_two_records() {
        let mut buf = record_bytes(item_type::NODE, &[1, 2, 3]);
        buf.extend(record_bytes(item_type::WAY, &[]));

        let records: Vec<_> = RecordIter::new(&buf, 0).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_type(), ItemType::Node);
        assert_eq!(records[0].byte_size(), 11);
        assert_eq!(records[0].padded_size(), 16);
        assert_eq!(records[0].body(), &[1, 2, 3]);
        assert_eq!(records[1].offset(), 16);
        assert_eq!(records[1].item_type(), ItemType::Way);
        assert_eq!(validate_records(&buf).unwrap(), 2);
    }

    #[test]
    fn base_offset_is_added() {
        let buf = record_bytes(item_type::TAG_LIST, &[0; 8]);
        let record = RecordIter::new(&buf, 64).next().unwrap();
        assert_eq!(record.offset(), 64);
    }

    #[test]
    fn iteration_is_restartable() {
        let buf = record_bytes(item_type::NODE, &[9; 20]);
        let iter = RecordIter::new(&buf, 0);
        assert_eq!(iter.clone().count(), 1);
        assert_eq!(iter.count(), 1);
    }

    #[test]
    fn validate_rejects_overrun() {
        let mut buf = record_bytes(item_type::NODE, &[0; 8]);
        buf.truncate(12);
        assert!(validate_records(&buf).is_err());
        assert_eq!(RecordIter::new(&buf, 0).count(), 0);
    }

    #[test]
    fn children_region() {
        let child = record_bytes(item_type::TAG_LIST, &[]);
        let mut body = vec![0u8; 8];
        body.extend(&child);
        let parent = record_bytes(item_type::WAY, &body);

        let record = Record::parse(&parent, 0, 0).unwrap();
        let children: Vec<_> = record.children_from(16).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].item_type(), ItemType::TagList);
        assert_eq!(children[0].offset(), 16);
    }
}
