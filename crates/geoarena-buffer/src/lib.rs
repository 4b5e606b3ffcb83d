#![warn(clippy::pedantic)]

pub mod buffer;
pub mod builder;
pub mod error;

mod entity;

pub use buffer::{Buffer, GrowthPolicy, Mark};
pub use builder::BuilderStack;
pub use error::{BufferError, BuilderError};
