use geoarena_wire::varint::read_length_prefixed;
use geoarena_wire::{padded_length, DiffIndicator, RECORD_HEADER_SIZE};

use crate::collections::{MemberList, NodeRefList, TagList};
use crate::error::TypeError;
use crate::item_type::ItemType;
use crate::location::{Location, LOCATION_SIZE};
use crate::object::{ChangesetFields, ObjectFields, CHANGESET_FIELDS_SIZE, OBJECT_FIELDS_SIZE};
use crate::record::{Record, RecordIter};
use crate::timestamp::Timestamp;

/// Layout of an entity record body after its fixed fields:
///
/// ```text
/// ┌──────────────────────────────────────────────────┐
/// │ fixed fields (32 bytes, nodes +8 for location,   │
/// │               changesets 40 bytes)               │
/// │ user name    (varint len + UTF-8 bytes)          │
/// │ zero padding up to the next 8-byte boundary      │
/// │ child records (tag list, way node list,          │
/// │                member list), each padded         │
/// └──────────────────────────────────────────────────┘
/// ```
///
/// Returns `(user, children_start)` where `children_start` is relative
/// to the start of the record.
fn split_user<'a>(record: &Record<'a>, fixed: usize) -> Result<(&'a str, usize), TypeError> {
    let body = record.body();
    let rest = body.get(fixed..).ok_or(TypeError::Truncated {
        kind: "entity",
        offset: body.len(),
    })?;
    let (bytes, n) = read_length_prefixed(rest)?;
    let user = std::str::from_utf8(bytes).map_err(|_| TypeError::InvalidUtf8 { field: "user" })?;
    Ok((user, padded_length(RECORD_HEADER_SIZE + fixed + n)))
}

/// Children found while validating an entity.
#[derive(Clone, Copy, Debug)]
struct Children<'a> {
    tags: Option<TagList<'a>>,
    nodes: Option<NodeRefList<'a>>,
    members: Option<MemberList<'a>>,
}

fn scan_children<'a>(record: &Record<'a>, start: usize) -> Result<Children<'a>, TypeError> {
    let mut found = Children {
        tags: None,
        nodes: None,
        members: None,
    };
    if start >= record.byte_size() {
        return Ok(found);
    }
    let region = &record.bytes()[start..];
    crate::record::validate_records(region)?;

    for child in RecordIter::new(region, record.offset() + start) {
        match child.item_type() {
            ItemType::TagList if found.tags.is_none() => found.tags = Some(TagList::new(child)?),
            ItemType::WayNodeList if found.nodes.is_none() => {
                found.nodes = Some(NodeRefList::new(child)?);
            }
            ItemType::RelationMemberList if found.members.is_none() => {
                found.members = Some(MemberList::new(child)?);
            }
            _ => {}
        }
    }
    Ok(found)
}

/// Validated view of a node, way or relation record.
///
/// All parsing happens in [`ObjectView::new`]; accessors are infallible.
/// When a record holds several child lists of the same kind, the first
/// one is exposed.
#[derive(Clone, Copy, Debug)]
pub struct ObjectView<'a> {
    record: Record<'a>,
    fields: ObjectFields,
    location: Location,
    user: &'a str,
    children_start: usize,
    children: Children<'a>,
}

impl<'a> ObjectView<'a> {
    /// # Errors
    ///
    /// [`TypeError::WrongType`] if the record is not a node, way or
    /// relation, or any decoding error in its fields or children.
    pub fn new(record: Record<'a>) -> Result<Self, TypeError> {
        let kind = record.item_type();
        if !kind.is_object() {
            return Err(TypeError::WrongType {
                expected: "node, way or relation",
                found: kind,
            });
        }

        let body = record.body();
        let fields = ObjectFields::read_from(body)?;
        let mut fixed = OBJECT_FIELDS_SIZE;
        let location = if kind == ItemType::Node {
            let loc = Location::read_from(body.get(fixed..).unwrap_or(&[]))?;
            fixed += LOCATION_SIZE;
            loc
        } else {
            Location::undefined()
        };

        let (user, children_start) = split_user(&record, fixed)?;
        let children = scan_children(&record, children_start)?;

        Ok(Self {
            record,
            fields,
            location,
            user,
            children_start,
            children,
        })
    }

    #[must_use]
    pub fn record(&self) -> Record<'a> {
        self.record
    }

    #[must_use]
    pub fn kind(&self) -> ItemType {
        self.record.item_type()
    }

    #[must_use]
    pub fn fields(&self) -> &ObjectFields {
        &self.fields
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.fields.id
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.fields.version
    }

    #[must_use]
    pub fn changeset(&self) -> u32 {
        self.fields.changeset
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.fields.timestamp
    }

    #[must_use]
    pub fn uid(&self) -> u32 {
        self.fields.uid
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        self.fields.visible
    }

    /// Node location; undefined for ways and relations.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    #[must_use]
    pub fn user(&self) -> &'a str {
        self.user
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.record.is_removed()
    }

    #[must_use]
    pub fn diff(&self) -> DiffIndicator {
        self.record.diff()
    }

    #[must_use]
    pub fn tags(&self) -> TagList<'a> {
        self.children.tags.unwrap_or_else(TagList::empty)
    }

    /// Way node references; empty for nodes and relations.
    #[must_use]
    pub fn nodes(&self) -> NodeRefList<'a> {
        self.children
            .nodes
            .unwrap_or_else(|| NodeRefList::empty(ItemType::WayNodeList))
    }

    /// Relation members; empty for nodes and ways.
    #[must_use]
    pub fn members(&self) -> MemberList<'a> {
        self.children.members.unwrap_or_else(MemberList::empty)
    }

    /// Every child record, including ones of kinds this view does not
    /// interpret (rings).
    #[must_use]
    pub fn children(&self) -> RecordIter<'a> {
        self.record.children_from(self.children_start)
    }
}

/// Validated view of a changeset record.
#[derive(Clone, Copy, Debug)]
pub struct ChangesetView<'a> {
    record: Record<'a>,
    fields: ChangesetFields,
    user: &'a str,
    tags: Option<TagList<'a>>,
}

impl<'a> ChangesetView<'a> {
    /// # Errors
    ///
    /// [`TypeError::WrongType`] for non-changeset records, or any decoding
    /// error in the fields, user name or tag list.
    pub fn new(record: Record<'a>) -> Result<Self, TypeError> {
        if record.item_type() != ItemType::Changeset {
            return Err(TypeError::WrongType {
                expected: "changeset",
                found: record.item_type(),
            });
        }
        let fields = ChangesetFields::read_from(record.body())?;
        let (user, children_start) = split_user(&record, CHANGESET_FIELDS_SIZE)?;
        let children = scan_children(&record, children_start)?;
        Ok(Self {
            record,
            fields,
            user,
            tags: children.tags,
        })
    }

    #[must_use]
    pub fn record(&self) -> Record<'a> {
        self.record
    }

    #[must_use]
    pub fn fields(&self) -> &ChangesetFields {
        &self.fields
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.fields.id
    }

    #[must_use]
    pub fn user(&self) -> &'a str {
        self.user
    }

    #[must_use]
    pub fn tags(&self) -> TagList<'a> {
        self.tags.unwrap_or_else(TagList::empty)
    }
}

/// A top-level record interpreted by kind.
#[derive(Clone, Copy, Debug)]
pub enum Entity<'a> {
    Node(ObjectView<'a>),
    Way(ObjectView<'a>),
    Relation(ObjectView<'a>),
    Changeset(ChangesetView<'a>),
    /// Records of kinds that are not entities, kept as raw views.
    Other(Record<'a>),
}

impl<'a> Entity<'a> {
    /// # Errors
    ///
    /// Any decoding error from the typed view for the record's kind.
    pub fn from_record(record: Record<'a>) -> Result<Self, TypeError> {
        Ok(match record.item_type() {
            ItemType::Node => Self::Node(ObjectView::new(record)?),
            ItemType::Way => Self::Way(ObjectView::new(record)?),
            ItemType::Relation => Self::Relation(ObjectView::new(record)?),
            ItemType::Changeset => Self::Changeset(ChangesetView::new(record)?),
            _ => Self::Other(record),
        })
    }

    #[must_use]
    pub fn record(&self) -> Record<'a> {
        match self {
            Self::Node(v) | Self::Way(v) | Self::Relation(v) => v.record(),
            Self::Changeset(v) => v.record(),
            Self::Other(r) => *r,
        }
    }

    #[must_use]
    pub fn item_type(&self) -> ItemType {
        self.record().item_type()
    }

    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Node(v) | Self::Way(v) | Self::Relation(v) => Some(v.id()),
            Self::Changeset(v) => Some(v.id()),
            Self::Other(_) => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectView<'a>> {
        match self {
            Self::Node(v) | Self::Way(v) | Self::Relation(v) => Some(v),
            _ => None,
        }
    }
}
