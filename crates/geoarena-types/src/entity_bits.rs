use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::item_type::ItemType;

/// Set of entity kinds, used to select what a pipeline should decode.
///
/// Bit layout:
///   bit 0 = node
///   bit 1 = way
///   bit 2 = relation
///   bit 3 = changeset
///
/// An empty mask is meaningful: the pipeline then reads only the stream
/// header and stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntityBits(u8);

impl EntityBits {
    pub const NOTHING: Self = Self(0);
    pub const NODE: Self = Self(0b0001);
    pub const WAY: Self = Self(0b0010);
    pub const RELATION: Self = Self(0b0100);
    pub const CHANGESET: Self = Self(0b1000);
    pub const NWR: Self = Self(0b0111);
    pub const ALL: Self = Self(0b1111);

    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        Self(raw & Self::ALL.0)
    }

    #[must_use]
    pub fn raw(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if records of `kind` are selected by this mask. Non-entity
    /// kinds are never selected.
    #[must_use]
    pub fn includes(self, kind: ItemType) -> bool {
        self.intersects(kind.entity_bits())
    }
}

impl BitOr for EntityBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EntityBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EntityBits {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for EntityBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("nothing");
        }
        let names = [
            (Self::NODE, "node"),
            (Self::WAY, "way"),
            (Self::RELATION, "relation"),
            (Self::CHANGESET, "changeset"),
        ];
        let mut first = true;
        for (bit, name) in names {
            if self.contains(bit) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nwr_is_union_of_objects() {
        assert_eq!(
            EntityBits::NODE | EntityBits::WAY | EntityBits::RELATION,
            EntityBits::NWR
        );
        assert!(EntityBits::ALL.contains(EntityBits::NWR | EntityBits::CHANGESET));
    }

    #[test]
    fn includes_by_item_type() {
        let mask = EntityBits::WAY | EntityBits::CHANGESET;
        assert!(mask.includes(ItemType::Way));
        assert!(mask.includes(ItemType::Changeset));
        assert!(!mask.includes(ItemType::Node));
        assert!(!EntityBits::ALL.includes(ItemType::TagList));
    }

    #[test]
    fn empty_mask() {
        assert!(EntityBits::NOTHING.is_empty());
        assert!(!EntityBits::NOTHING.includes(ItemType::Node));
        assert_eq!(EntityBits::NOTHING.to_string(), "nothing");
    }

    #[test]
    fn display_lists_kinds() {
        assert_eq!((EntityBits::NODE | EntityBits::RELATION).to_string(), "node,relation");
    }

    #[test]
    fn from_raw_drops_unknown_bits() {
        assert_eq!(EntityBits::from_raw(0xFF), EntityBits::ALL);
    }
}
