#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod transport;

pub use codec::{Codec, CodecKind, NoCodec, ZlibCodec, ZstdCodec, codec_for};
pub use error::CodecError;
pub use transport::{MAX_FRAME_RAW_SIZE, decode_buffer, encode_buffer};
