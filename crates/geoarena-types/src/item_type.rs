use std::fmt;

use geoarena_wire::item_type as tag;

use crate::entity_bits::EntityBits;

/// Record kinds stored in an arena.
///
/// Each variant maps to the `u16` type tag in the record header and
/// mirrored by the `geoarena_wire::item_type` constants. Unknown tags are
/// preserved by `Unknown(u16)` so a buffer written by a newer producer
/// can still be walked and re-emitted.
///
/// ```text
/// ┌──────┬────────────────────┬──────────────┬──────┐
/// │ Wire │ Variant            │ Shape        │ Char │
/// ├──────┼────────────────────┼──────────────┼──────┤
/// │ 0x00 │ Undefined          │ Opaque       │ -    │
/// │ 0x01 │ Node               │ Entity       │ n    │
/// │ 0x02 │ Way                │ Entity       │ w    │
/// │ 0x03 │ Relation           │ Entity       │ r    │
/// │ 0x05 │ Changeset          │ Changeset    │ c    │
/// │ 0x11 │ TagList            │ TagList      │ -    │
/// │ 0x12 │ WayNodeList        │ NodeRefList  │ -    │
/// │ 0x13 │ RelationMemberList │ MemberList   │ -    │
/// │ 0x40 │ OuterRing          │ NodeRefList  │ -    │
/// │ 0x41 │ InnerRing          │ NodeRefList  │ -    │
/// └──────┴────────────────────┴──────────────┴──────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemType {
    Undefined,
    Node,
    Way,
    Relation,
    Changeset,
    TagList,
    WayNodeList,
    RelationMemberList,
    OuterRing,
    InnerRing,
    Unknown(u16),
}

/// Byte layout family of a record body.
///
/// Two item types with the same shape can be reinterpreted as each other
/// without touching the body, which is what [`ItemType::can_retag_to`]
/// checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageShape {
    Entity,
    Changeset,
    TagList,
    NodeRefList,
    MemberList,
    Opaque,
}

impl ItemType {
    #[must_use]
    pub fn wire_id(self) -> u16 {
        match self {
            Self::Undefined => tag::UNDEFINED,
            Self::Node => tag::NODE,
            Self::Way => tag::WAY,
            Self::Relation => tag::RELATION,
            Self::Changeset => tag::CHANGESET,
            Self::TagList => tag::TAG_LIST,
            Self::WayNodeList => tag::WAY_NODE_LIST,
            Self::RelationMemberList => tag::RELATION_MEMBER_LIST,
            Self::OuterRing => tag::OUTER_RING,
            Self::InnerRing => tag::INNER_RING,
            Self::Unknown(id) => id,
        }
    }

    #[must_use]
    pub fn from_wire_id(id: u16) -> Self {
        match id {
            tag::UNDEFINED => Self::Undefined,
            tag::NODE => Self::Node,
            tag::WAY => Self::Way,
            tag::RELATION => Self::Relation,
            tag::CHANGESET => Self::Changeset,
            tag::TAG_LIST => Self::TagList,
            tag::WAY_NODE_LIST => Self::WayNodeList,
            tag::RELATION_MEMBER_LIST => Self::RelationMemberList,
            tag::OUTER_RING => Self::OuterRing,
            tag::INNER_RING => Self::InnerRing,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
            Self::Changeset => "changeset",
            Self::TagList => "tag_list",
            Self::WayNodeList => "way_node_list",
            Self::RelationMemberList => "relation_member_list",
            Self::OuterRing => "outer_ring",
            Self::InnerRing => "inner_ring",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Single-letter abbreviation used for relation member types.
    #[must_use]
    pub fn as_char(self) -> Option<char> {
        match self {
            Self::Node => Some('n'),
            Self::Way => Some('w'),
            Self::Relation => Some('r'),
            Self::Changeset => Some('c'),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'n' => Some(Self::Node),
            'w' => Some(Self::Way),
            'r' => Some(Self::Relation),
            'c' => Some(Self::Changeset),
            _ => None,
        }
    }

    /// Parse a member type as it appears in textual formats, either the
    /// full name or the single-letter abbreviation.
    #[must_use]
    pub fn from_member_name(name: &str) -> Option<Self> {
        match name {
            "node" | "n" => Some(Self::Node),
            "way" | "w" => Some(Self::Way),
            "relation" | "r" => Some(Self::Relation),
            _ => None,
        }
    }

    /// Node, way or relation: the kinds that share the object field layout.
    #[must_use]
    pub fn is_object(self) -> bool {
        matches!(self, Self::Node | Self::Way | Self::Relation)
    }

    /// Top-level kinds the pipeline emits.
    #[must_use]
    pub fn is_entity(self) -> bool {
        self.is_object() || self == Self::Changeset
    }

    #[must_use]
    pub fn shape(self) -> StorageShape {
        match self {
            Self::Node | Self::Way | Self::Relation => StorageShape::Entity,
            Self::Changeset => StorageShape::Changeset,
            Self::TagList => StorageShape::TagList,
            Self::WayNodeList | Self::OuterRing | Self::InnerRing => StorageShape::NodeRefList,
            Self::RelationMemberList => StorageShape::MemberList,
            Self::Undefined | Self::Unknown(_) => StorageShape::Opaque,
        }
    }

    /// Whether a record of this kind may be relabelled as `target`.
    ///
    /// Only node reference lists can change kind (way node list, outer
    /// ring and inner ring), since they share one body layout.
    #[must_use]
    pub fn can_retag_to(self, target: Self) -> bool {
        self == target
            || (self.shape() == StorageShape::NodeRefList
                && target.shape() == StorageShape::NodeRefList)
    }

    /// The entity mask bit for this kind, or `NOTHING` for non-entities.
    #[must_use]
    pub fn entity_bits(self) -> EntityBits {
        match self {
            Self::Node => EntityBits::NODE,
            Self::Way => EntityBits::WAY,
            Self::Relation => EntityBits::RELATION,
            Self::Changeset => EntityBits::CHANGESET,
            _ => EntityBits::NOTHING,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown({id:#06X})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_known_variants_roundtrip() {
        let variants = [
            (ItemType::Undefined, 0x00),
            (ItemType::Node, 0x01),
            (ItemType::Way, 0x02),
            (ItemType::Relation, 0x03),
            (ItemType::Changeset, 0x05),
            (ItemType::TagList, 0x11),
            (ItemType::WayNodeList, 0x12),
            (ItemType::RelationMemberList, 0x13),
            (ItemType::OuterRing, 0x40),
            (ItemType::InnerRing, 0x41),
        ];
        for (variant, wire) in variants {
            assert_eq!(variant.wire_id(), wire, "wire_id mismatch for {variant:?}");
            assert_eq!(ItemType::from_wire_id(wire), variant);
        }
    }

    #[test]
    fn unknown_value_preserved() {
        let unknown = ItemType::from_wire_id(0x0777);
        assert_eq!(unknown, ItemType::Unknown(0x0777));
        assert_eq!(unknown.wire_id(), 0x0777);
        assert_eq!(unknown.to_string(), "unknown(0x0777)");
    }

    #[test]
    fn retag_only_within_node_ref_lists() {
        assert!(ItemType::WayNodeList.can_retag_to(ItemType::OuterRing));
        assert!(ItemType::OuterRing.can_retag_to(ItemType::InnerRing));
        assert!(ItemType::TagList.can_retag_to(ItemType::TagList));
        assert!(!ItemType::TagList.can_retag_to(ItemType::WayNodeList));
        assert!(!ItemType::Node.can_retag_to(ItemType::Way));
    }

    #[test]
    fn member_type_chars() {
        for kind in [ItemType::Node, ItemType::Way, ItemType::Relation] {
            let c = kind.as_char().unwrap();
            assert_eq!(ItemType::from_char(c), Some(kind));
            assert_eq!(ItemType::from_member_name(kind.name()), Some(kind));
        }
        assert_eq!(ItemType::from_char('x'), None);
        assert_eq!(ItemType::TagList.as_char(), None);
    }
}
