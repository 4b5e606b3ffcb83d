use geoarena_buffer::GrowthPolicy;
use geoarena_types::EntityBits;

/// When to start a new buffer because the kind of entity changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Segregation {
    /// Mix kinds freely within one buffer.
    None,
    /// Flush whenever the entity kind changes.
    #[default]
    ByType,
    /// Flush whenever the kind or the change-file section changes.
    ByTypeAndChange,
}

/// Configuration for a [`Reader`](crate::Reader) pipeline.
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────────────┐
/// │ Field           │ Purpose                                          │
/// ├─────────────────┼──────────────────────────────────────────────────┤
/// │ read_types      │ Entity kinds to build; others are skipped        │
/// │ read_metadata   │ Store version/changeset/timestamp/uid/user       │
/// │ segregation     │ Start a new buffer when the entity kind changes  │
/// │ buffer_capacity │ Initial capacity of every buffer (bytes)         │
/// │ growth          │ What a full buffer does (fixed/grow/spill)       │
/// │ flush_threshold │ Flush once free capacity drops below this        │
/// │ max_queue_len   │ Buffers queued before the producer blocks        │
/// │ pool_threads    │ Workers for blob decoding (None = available CPUs)│
/// └─────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// An empty `read_types` mask still delivers the header, then ends the
/// stream without reading any entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub read_types: EntityBits,
    pub read_metadata: bool,
    pub segregation: Segregation,
    pub buffer_capacity: usize,
    pub growth: GrowthPolicy,
    pub flush_threshold: usize,
    pub max_queue_len: usize,
    pub pool_threads: Option<usize>,
}

impl Default for PipelineConfig {
    /// All entity kinds with metadata, segregated by type, 1 MiB
    /// auto-growing buffers flushed below 256 KiB of free space, and up
    /// to 100 queued buffers.
    fn default() -> Self {
        Self {
            read_types: EntityBits::ALL,
            read_metadata: true,
            segregation: Segregation::default(),
            buffer_capacity: 1024 * 1024,
            growth: GrowthPolicy::AutoGrow,
            flush_threshold: 256 * 1024,
            max_queue_len: 100,
            pool_threads: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_read_types(mut self, read_types: EntityBits) -> Self {
        self.read_types = read_types;
        self
    }

    #[must_use]
    pub fn with_read_metadata(mut self, read_metadata: bool) -> Self {
        self.read_metadata = read_metadata;
        self
    }

    #[must_use]
    pub fn with_segregation(mut self, segregation: Segregation) -> Self {
        self.segregation = segregation;
        self
    }

    #[must_use]
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    #[must_use]
    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    #[must_use]
    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    #[must_use]
    pub fn with_max_queue_len(mut self, max_queue_len: usize) -> Self {
        self.max_queue_len = max_queue_len;
        self
    }

    #[must_use]
    pub fn with_pool_threads(mut self, threads: usize) -> Self {
        self.pool_threads = Some(threads);
        self
    }
}
