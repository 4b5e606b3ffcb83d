#![warn(clippy::pedantic)]

pub mod config;
pub mod decoder;
pub mod error;
pub mod format;
pub mod frames;
pub mod oneshot;
pub mod pool;
pub mod queue;
pub mod reader;
pub mod registry;

mod attributes;
mod parser;

pub use config::{PipelineConfig, Segregation};
pub use decoder::{BlobTask, ChangeSection, DecodeEvent, Decoder, EventListDecoder};
pub use error::PipelineError;
pub use format::FileFormat;
pub use frames::{FrameDecoder, FrameWriter};
pub use pool::Pool;
pub use queue::Queue;
pub use reader::Reader;
pub use registry::{DecoderConstructor, FormatRegistry, Input};
