#![warn(clippy::pedantic)]

pub mod align;
pub mod error;
pub mod item_type;
pub mod record_header;
pub mod varint;

pub use align::{ALIGN_BYTES, is_aligned, padded_length};
pub use error::WireError;
pub use record_header::{DiffIndicator, RECORD_HEADER_SIZE, RecordFlags, RecordHeader};
