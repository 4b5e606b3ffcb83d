use geoarena_wire::varint::{push_length_prefixed, read_length_prefixed};

use crate::error::TypeError;
use crate::item_type::{ItemType, StorageShape};
use crate::location::Location;
use crate::record::Record;

// ── Tag lists ─────────────────────────────────────────────────────────
//
// Body: repeated `varint klen | key | varint vlen | value`, no per-entry
// padding. The list is validated once when the view is built, so the
// iterator itself cannot fail.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Append one encoded tag to a tag list body.
pub fn encode_tag(out: &mut Vec<u8>, key: &str, value: &str) {
    push_length_prefixed(out, key.as_bytes());
    push_length_prefixed(out, value.as_bytes());
}

fn read_str<'a>(buf: &'a [u8], field: &'static str) -> Result<(&'a str, usize), TypeError> {
    let (bytes, n) = read_length_prefixed(buf)?;
    let text = std::str::from_utf8(bytes).map_err(|_| TypeError::InvalidUtf8 { field })?;
    Ok((text, n))
}

#[derive(Clone, Copy, Debug)]
pub struct TagList<'a> {
    data: &'a [u8],
    len: usize,
}

impl<'a> TagList<'a> {
    #[must_use]
    pub fn empty() -> Self {
        Self { data: &[], len: 0 }
    }

    /// # Errors
    ///
    /// [`TypeError::WrongType`] for a non tag-list record, otherwise the
    /// first decoding error among the entries.
    pub fn new(record: Record<'a>) -> Result<Self, TypeError> {
        if record.item_type().shape() != StorageShape::TagList {
            return Err(TypeError::WrongType {
                expected: "tag_list",
                found: record.item_type(),
            });
        }
        let data = record.body();
        let mut pos = 0;
        let mut len = 0;
        while pos < data.len() {
            let (_, n) = read_str(&data[pos..], "tag key")?;
            pos += n;
            let (_, n) = read_str(&data[pos..], "tag value")?;
            pos += n;
            len += 1;
        }
        Ok(Self { data, len })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn iter(&self) -> TagIter<'a> {
        TagIter {
            data: self.data,
            pos: 0,
        }
    }

    /// Value of the first tag with the given key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.iter().find(|t| t.key == key).map(|t| t.value)
    }
}

impl<'a> IntoIterator for TagList<'a> {
    type Item = Tag<'a>;
    type IntoIter = TagIter<'a>;

    fn into_iter(self) -> TagIter<'a> {
        self.iter()
    }
}

#[derive(Clone, Debug)]
pub struct TagIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for TagIter<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        if self.pos >= self.data.len() {
            return None;
        }
        let (key, n) = read_str(&self.data[self.pos..], "tag key").ok()?;
        self.pos += n;
        let (value, n) = read_str(&self.data[self.pos..], "tag value").ok()?;
        self.pos += n;
        Some(Tag { key, value })
    }
}

// ── Node reference lists (way nodes and rings) ────────────────────────

/// Encoded size of one [`NodeRef`]: `i64 id | i32 x | i32 y`.
pub const NODE_REF_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeRef {
    pub id: i64,
    pub location: Location,
}

impl NodeRef {
    #[must_use]
    pub fn new(id: i64, location: Location) -> Self {
        Self { id, location }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        self.location.write_to(out);
    }

    fn read_from(chunk: &[u8]) -> Self {
        let mut id = [0u8; 8];
        id.copy_from_slice(&chunk[..8]);
        // chunk is always NODE_REF_SIZE long, the location read cannot fail
        let location = Location::read_from(&chunk[8..]).unwrap_or_default();
        Self {
            id: i64::from_le_bytes(id),
            location,
        }
    }
}

/// View over a way node list, outer ring or inner ring record.
#[derive(Clone, Copy, Debug)]
pub struct NodeRefList<'a> {
    kind: ItemType,
    data: &'a [u8],
}

impl<'a> NodeRefList<'a> {
    #[must_use]
    pub fn empty(kind: ItemType) -> Self {
        Self { kind, data: &[] }
    }

    /// # Errors
    ///
    /// [`TypeError::WrongType`] for records of another shape and
    /// [`TypeError::Truncated`] if the body is not a whole number of
    /// entries.
    pub fn new(record: Record<'a>) -> Result<Self, TypeError> {
        let kind = record.item_type();
        if kind.shape() != StorageShape::NodeRefList {
            return Err(TypeError::WrongType {
                expected: "node reference list",
                found: kind,
            });
        }
        let data = record.body();
        if data.len() % NODE_REF_SIZE != 0 {
            return Err(TypeError::Truncated {
                kind: "node reference list",
                offset: data.len() - data.len() % NODE_REF_SIZE,
            });
        }
        Ok(Self { kind, data })
    }

    #[must_use]
    pub fn kind(&self) -> ItemType {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / NODE_REF_SIZE
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<NodeRef> {
        let start = index.checked_mul(NODE_REF_SIZE)?;
        self.data
            .get(start..start + NODE_REF_SIZE)
            .map(NodeRef::read_from)
    }

    #[must_use]
    pub fn first(&self) -> Option<NodeRef> {
        self.get(0)
    }

    #[must_use]
    pub fn last(&self) -> Option<NodeRef> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// First and last node share an id. Empty lists are not closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => self.len() > 1 && first.id == last.id,
            _ => false,
        }
    }

    pub fn iter(self) -> impl DoubleEndedIterator<Item = NodeRef> + ExactSizeIterator + 'a {
        self.data.chunks_exact(NODE_REF_SIZE).map(NodeRef::read_from)
    }
}

// ── Relation member lists ─────────────────────────────────────────────
//
// Body: repeated `i64 ref | u16 member type | varint rlen | role`.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member<'a> {
    pub kind: ItemType,
    pub id: i64,
    pub role: &'a str,
}

/// Append one encoded member to a member list body.
pub fn encode_member(out: &mut Vec<u8>, kind: ItemType, id: i64, role: &str) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&kind.wire_id().to_le_bytes());
    push_length_prefixed(out, role.as_bytes());
}

const MEMBER_FIXED_SIZE: usize = 10;

fn read_member(buf: &[u8]) -> Result<(Member<'_>, usize), TypeError> {
    if buf.len() < MEMBER_FIXED_SIZE {
        return Err(TypeError::Truncated {
            kind: "relation member",
            offset: buf.len(),
        });
    }
    let mut id = [0u8; 8];
    id.copy_from_slice(&buf[..8]);
    let raw_kind = u16::from_le_bytes([buf[8], buf[9]]);
    let kind = ItemType::from_wire_id(raw_kind);
    if !kind.is_object() {
        return Err(TypeError::InvalidMemberType { value: raw_kind });
    }
    let (role, n) = read_str(&buf[MEMBER_FIXED_SIZE..], "member role")?;
    Ok((
        Member {
            kind,
            id: i64::from_le_bytes(id),
            role,
        },
        MEMBER_FIXED_SIZE + n,
    ))
}

#[derive(Clone, Copy, Debug)]
pub struct MemberList<'a> {
    data: &'a [u8],
    len: usize,
}

impl<'a> MemberList<'a> {
    #[must_use]
    pub fn empty() -> Self {
        Self { data: &[], len: 0 }
    }

    /// # Errors
    ///
    /// [`TypeError::WrongType`] for a non member-list record, otherwise
    /// the first decoding error among the entries.
    pub fn new(record: Record<'a>) -> Result<Self, TypeError> {
        if record.item_type().shape() != StorageShape::MemberList {
            return Err(TypeError::WrongType {
                expected: "relation_member_list",
                found: record.item_type(),
            });
        }
        let data = record.body();
        let mut pos = 0;
        let mut len = 0;
        while pos < data.len() {
            let (_, n) = read_member(&data[pos..])?;
            pos += n;
            len += 1;
        }
        Ok(Self { data, len })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Member<'a>> + 'a {
        let data = self.data;
        let mut pos = 0;
        std::iter::from_fn(move || {
            if pos >= data.len() {
                return None;
            }
            let (member, n) = read_member(&data[pos..]).ok()?;
            pos += n;
            Some(member)
        })
    }
}
