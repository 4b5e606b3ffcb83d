//! Known record type tags.
//!
//! These are the raw `u16` values stored in the `type_tag` field of every
//! record header. The `geoarena-types` crate wraps them in the typed
//! `ItemType` enum; the constants live here so the framing layer and the
//! fuzz targets can refer to them without pulling in the typed layer.
//!
//! Entity kinds occupy the low range, collections start at `0x10` and
//! geometry rings at `0x40`.

pub const UNDEFINED: u16 = 0x00;
pub const NODE: u16 = 0x01;
pub const WAY: u16 = 0x02;
pub const RELATION: u16 = 0x03;
pub const CHANGESET: u16 = 0x05;
pub const TAG_LIST: u16 = 0x11;
pub const WAY_NODE_LIST: u16 = 0x12;
pub const RELATION_MEMBER_LIST: u16 = 0x13;
pub const OUTER_RING: u16 = 0x40;
pub const INNER_RING: u16 = 0x41;
