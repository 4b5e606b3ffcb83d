//! Format registry: maps a [`FileFormat`] to the constructor of its
//! decoder.
//!
//! The process-wide instance from [`FormatRegistry::global`] is created
//! on first use with the built-in formats. Tests and embedders that need
//! isolation build their own registry and pass it to
//! [`Reader::with_registry`](crate::Reader::with_registry).

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::decoder::Decoder;
use crate::error::PipelineError;
use crate::format::FileFormat;
use crate::frames::FrameDecoder;

/// Raw input handed to a decoder constructor.
pub type Input = Box<dyn Read + Send>;

/// Builds a decoder for one input stream.
pub type DecoderConstructor =
    Arc<dyn Fn(Input) -> Result<Box<dyn Decoder>, PipelineError> + Send + Sync>;

#[derive(Default)]
pub struct FormatRegistry {
    constructors: RwLock<HashMap<FileFormat, DecoderConstructor>>,
}

impl FormatRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the formats this crate implements.
    #[must_use]
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(FileFormat::Arena, |input| {
            Ok(Box::new(FrameDecoder::new(input)) as Box<dyn Decoder>)
        });
        registry
    }

    /// The process-wide registry.
    pub fn global() -> &'static FormatRegistry {
        static GLOBAL: OnceLock<FormatRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtin)
    }

    /// Register `constructor` for `format`. The last registration wins;
    /// returns `true` if it replaced an earlier one.
    pub fn register<F>(&self, format: FileFormat, constructor: F) -> bool
    where
        F: Fn(Input) -> Result<Box<dyn Decoder>, PipelineError> + Send + Sync + 'static,
    {
        let replaced = self
            .constructors
            .write()
            .insert(format, Arc::new(constructor))
            .is_some();
        debug!(%format, replaced, "registered decoder");
        replaced
    }

    /// # Errors
    ///
    /// [`PipelineError::UnsupportedFormat`] listing the registered formats.
    pub fn resolve(&self, format: FileFormat) -> Result<DecoderConstructor, PipelineError> {
        let found = self.constructors.read().get(&format).cloned();
        found.ok_or_else(|| PipelineError::UnsupportedFormat {
            format: format.to_string(),
            available: self
                .formats()
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Build a decoder for `input`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnsupportedFormat`], or whatever the constructor
    /// reports.
    pub fn create(&self, format: FileFormat, input: Input) -> Result<Box<dyn Decoder>, PipelineError> {
        let constructor = self.resolve(format)?;
        constructor(input)
    }

    #[must_use]
    pub fn contains(&self, format: FileFormat) -> bool {
        self.constructors.read().contains_key(&format)
    }

    /// Registered formats, sorted.
    #[must_use]
    pub fn formats(&self) -> Vec<FileFormat> {
        let mut formats: Vec<_> = self.constructors.read().keys().copied().collect();
        formats.sort_unstable();
        formats
    }
}
