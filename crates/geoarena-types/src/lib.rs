#![warn(clippy::pedantic)]

pub mod error;
pub mod item_type;
pub mod entity_bits;
pub mod location;
pub mod timestamp;
pub mod header;
pub mod object;
pub mod record;
pub mod collections;
pub mod entity;

pub use collections::{Member, MemberList, NodeRef, NodeRefList, Tag, TagList};
pub use entity::{ChangesetView, Entity, ObjectView};
pub use entity_bits::EntityBits;
pub use error::TypeError;
pub use header::StreamHeader;
pub use item_type::{ItemType, StorageShape};
pub use location::{Bounds, Location};
pub use object::{ChangesetFields, ObjectFields};
pub use record::{Record, RecordIter};
pub use timestamp::Timestamp;
