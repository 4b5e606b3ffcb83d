use std::collections::VecDeque;
use std::fmt;

use geoarena_types::{Entity, ItemType, Record, RecordIter, TypeError};
use geoarena_wire::align::padding_for;
use geoarena_wire::record_header::RecordHeader;
use geoarena_wire::{ALIGN_BYTES, DiffIndicator, is_aligned, padded_length};
use tracing::debug;

use crate::error::BufferError;

/// What a [`Buffer`] does when a write would run past its capacity.
///
/// ```text
/// ┌───────────┬─────────────────────────────────────────────────┐
/// │ Policy    │ On overflow                                     │
/// ├───────────┼─────────────────────────────────────────────────┤
/// │ Fixed     │ fail with BufferError::Capacity, nothing moved  │
/// │ AutoGrow  │ reallocate to max(2 × capacity, needed)         │
/// │ Spill     │ move the committed prefix into a nested buffer, │
/// │           │ shift in-progress bytes to offset 0, then grow  │
/// │           │ only if the open record alone still won't fit   │
/// └───────────┴─────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrowthPolicy {
    Fixed,
    #[default]
    AutoGrow,
    Spill,
}

/// A rollback point inside the in-progress region.
///
/// The position is stored relative to the committed boundary, so a mark
/// survives reallocation and spilling. It becomes stale once the buffer
/// commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark {
    epoch: u64,
    pos: usize,
}

impl Mark {
    /// Bytes between the committed boundary and the mark.
    #[must_use]
    pub fn position(self) -> usize {
        self.pos
    }
}

/// Arena of 8-byte aligned records.
///
/// ```text
///  0                 committed            written          capacity
///  ├─────────────────────┼───────────────────┼─────────────────┤
///  │ committed records   │ in-progress bytes │ free            │
///  └─────────────────────┴───────────────────┴─────────────────┘
/// ```
///
/// Only the committed region is visible to readers: [`records`](Self::records),
/// [`get`](Self::get) and [`committed_bytes`](Self::committed_bytes) never
/// expose in-progress bytes. `committed` only moves forward on
/// [`commit`](Self::commit), and always sits on an alignment boundary,
/// so every committed record starts at an offset divisible by
/// [`ALIGN_BYTES`].
///
/// A buffer with an open builder frame refuses to commit. The frame
/// count is maintained by [`BuilderStack`](crate::BuilderStack).
pub struct Buffer {
    data: Vec<u8>,
    committed: usize,
    written: usize,
    growth: GrowthPolicy,
    open_frames: usize,
    epoch: u64,
    nested: VecDeque<Buffer>,
}

impl Buffer {
    /// Create an empty buffer. The capacity is rounded up to a multiple
    /// of [`ALIGN_BYTES`].
    #[must_use]
    pub fn new(capacity: usize, growth: GrowthPolicy) -> Self {
        Self {
            data: vec![0; padded_length(capacity)],
            committed: 0,
            written: 0,
            growth,
            open_frames: 0,
            epoch: 0,
            nested: VecDeque::new(),
        }
    }

    /// Adopt a byte vector holding complete records, e.g. one received
    /// over a transport. Every byte becomes committed.
    ///
    /// # Errors
    ///
    /// [`BufferError::Corrupt`] if `bytes` is not a gap-free sequence of
    /// well-formed records.
    pub fn from_committed_bytes(bytes: Vec<u8>, growth: GrowthPolicy) -> Result<Self, BufferError> {
        geoarena_types::record::validate_records(&bytes)?;
        let len = bytes.len();
        Ok(Self {
            data: bytes,
            committed: len,
            written: len,
            growth,
            open_frames: 0,
            epoch: 0,
            nested: VecDeque::new(),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Length of the committed region.
    #[must_use]
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Position of the write cursor.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Length of the in-progress region.
    #[must_use]
    pub fn in_progress_len(&self) -> usize {
        self.written - self.committed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed == 0
    }

    #[must_use]
    pub fn growth(&self) -> GrowthPolicy {
        self.growth
    }

    /// Bytes left before the write cursor reaches capacity.
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity() - self.written
    }

    /// Whether `n` more bytes fit without growing.
    #[must_use]
    pub fn has_room(&self, n: usize) -> bool {
        self.free() >= n
    }

    /// Whether a builder frame is currently open on this buffer.
    #[must_use]
    pub fn has_open_builder(&self) -> bool {
        self.open_frames > 0
    }

    // ── Writing ──────────────────────────────────────────────────

    /// Append `bytes` to the in-progress region and return the absolute
    /// offset they were written at.
    ///
    /// # Errors
    ///
    /// [`BufferError::Capacity`] on a full `Fixed` buffer. The buffer is
    /// unchanged in that case.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, BufferError> {
        self.ensure_room(bytes.len())?;
        let at = self.written;
        self.data[at..at + bytes.len()].copy_from_slice(bytes);
        self.written += bytes.len();
        Ok(at)
    }

    /// Append `n` zero bytes and return the absolute offset of the first.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn reserve_space(&mut self, n: usize) -> Result<usize, BufferError> {
        self.ensure_room(n)?;
        let at = self.written;
        self.data[at..at + n].fill(0);
        self.written += n;
        Ok(at)
    }

    /// Zero-fill up to the next alignment boundary.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn pad_to_alignment(&mut self) -> Result<(), BufferError> {
        let pad = padding_for(self.written);
        if pad > 0 {
            self.reserve_space(pad)?;
        }
        Ok(())
    }

    /// Move the committed boundary to the write cursor and return the
    /// offset of the first newly committed byte.
    ///
    /// # Errors
    ///
    /// - [`BufferError::OpenBuilder`] while a builder frame is open.
    /// - [`BufferError::Misaligned`] if the cursor is not on a boundary.
    pub fn commit(&mut self) -> Result<usize, BufferError> {
        if self.open_frames > 0 {
            return Err(BufferError::OpenBuilder);
        }
        if !is_aligned(self.written) {
            return Err(BufferError::Misaligned {
                offset: self.written,
            });
        }
        let start = self.committed;
        self.committed = self.written;
        self.epoch += 1;
        Ok(start)
    }

    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark {
            epoch: self.epoch,
            pos: self.in_progress_len(),
        }
    }

    /// Discard everything written after `mark`.
    ///
    /// # Errors
    ///
    /// [`BufferError::OpenBuilder`] while a builder frame is open, or
    /// [`BufferError::InvalidMark`] if the buffer committed since the
    /// mark was taken, or the mark lies past the write cursor.
    pub fn rollback_to(&mut self, mark: Mark) -> Result<(), BufferError> {
        if self.open_frames > 0 {
            return Err(BufferError::OpenBuilder);
        }
        if mark.epoch != self.epoch || mark.pos > self.in_progress_len() {
            return Err(BufferError::InvalidMark);
        }
        self.truncate_in_progress(mark.pos);
        Ok(())
    }

    /// Discard the whole in-progress region.
    ///
    /// # Errors
    ///
    /// [`BufferError::OpenBuilder`] while a builder frame is open.
    pub fn rollback(&mut self) -> Result<(), BufferError> {
        if self.open_frames > 0 {
            return Err(BufferError::OpenBuilder);
        }
        self.written = self.committed;
        Ok(())
    }

    /// Drop all records and nested buffers. Capacity is kept.
    ///
    /// # Errors
    ///
    /// [`BufferError::OpenBuilder`] while a builder frame is open.
    pub fn clear(&mut self) -> Result<(), BufferError> {
        if self.open_frames > 0 {
            return Err(BufferError::OpenBuilder);
        }
        self.committed = 0;
        self.written = 0;
        self.epoch += 1;
        self.nested.clear();
        Ok(())
    }

    fn ensure_room(&mut self, n: usize) -> Result<(), BufferError> {
        let needed = self
            .written
            .checked_add(n)
            .ok_or(BufferError::Capacity {
                requested: n,
                available: self.free(),
            })?;
        if needed <= self.capacity() {
            return Ok(());
        }
        match self.growth {
            GrowthPolicy::Fixed => Err(BufferError::Capacity {
                requested: n,
                available: self.free(),
            }),
            GrowthPolicy::Spill if self.committed > 0 => {
                self.spill();
                if self.written + n > self.capacity() {
                    self.grow(self.written + n);
                }
                Ok(())
            }
            GrowthPolicy::AutoGrow | GrowthPolicy::Spill => {
                self.grow(needed);
                Ok(())
            }
        }
    }

    fn grow(&mut self, needed: usize) {
        let target = padded_length(needed.max(self.capacity().saturating_mul(2)).max(ALIGN_BYTES));
        debug!(from = self.capacity(), to = target, "growing buffer");
        self.data.resize(target, 0);
    }

    fn spill(&mut self) {
        let prefix = self.data[..self.committed].to_vec();
        let len = prefix.len();
        debug!(bytes = len, pending = self.nested.len() + 1, "spilling committed records");
        self.nested.push_back(Self {
            data: prefix,
            committed: len,
            written: len,
            growth: GrowthPolicy::Fixed,
            open_frames: 0,
            epoch: 0,
            nested: VecDeque::new(),
        });
        self.data.copy_within(self.committed..self.written, 0);
        self.written -= self.committed;
        self.committed = 0;
    }

    // ── Reading ──────────────────────────────────────────────────

    /// The committed region.
    #[must_use]
    pub fn committed_bytes(&self) -> &[u8] {
        &self.data[..self.committed]
    }

    /// Iterate the committed top-level records in write order.
    #[must_use]
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter::new(self.committed_bytes(), 0)
    }

    /// Iterate the committed top-level records as typed entities.
    pub fn entities(&self) -> impl Iterator<Item = Result<Entity<'_>, TypeError>> + '_ {
        self.records().map(Entity::from_record)
    }

    /// The record starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`BufferError::NoRecordAt`] outside the committed region,
    /// [`BufferError::Corrupt`] if no well-formed record starts there.
    pub fn get(&self, offset: usize) -> Result<Record<'_>, BufferError> {
        if offset >= self.committed {
            return Err(BufferError::NoRecordAt { offset });
        }
        Ok(Record::parse(self.committed_bytes(), offset, 0)?)
    }

    // ── In-place edits ───────────────────────────────────────────

    /// Set or clear the removed flag of the committed record at `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn set_removed(&mut self, offset: usize, removed: bool) -> Result<(), BufferError> {
        let mut flags = self.header_at(offset)?.flags;
        flags.set_removed(removed);
        RecordHeader::patch_flags(&mut self.data[offset..], flags)?;
        Ok(())
    }

    /// Set the diff indicator of the committed record at `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn set_diff(&mut self, offset: usize, diff: DiffIndicator) -> Result<(), BufferError> {
        let mut flags = self.header_at(offset)?.flags;
        flags.set_diff(diff);
        RecordHeader::patch_flags(&mut self.data[offset..], flags)?;
        Ok(())
    }

    /// Relabel the committed record at `offset` as `target`.
    ///
    /// # Errors
    ///
    /// [`BufferError::RetagIncompatible`] unless both kinds share a body
    /// layout, plus everything [`get`](Self::get) reports.
    pub fn retag(&mut self, offset: usize, target: ItemType) -> Result<(), BufferError> {
        let from = ItemType::from_wire_id(self.header_at(offset)?.type_tag);
        if !from.can_retag_to(target) {
            return Err(BufferError::RetagIncompatible { from, to: target });
        }
        RecordHeader::patch_type_tag(&mut self.data[offset..], target.wire_id())?;
        Ok(())
    }

    /// Compact away every committed top-level record marked removed,
    /// keeping the survivors in order. In-progress bytes move down with
    /// them. Returns the number of records dropped.
    ///
    /// Offsets of surviving records change, so earlier offsets must not
    /// be reused.
    ///
    /// # Errors
    ///
    /// - [`BufferError::OpenBuilder`] while a builder frame is open.
    /// - [`BufferError::Corrupt`] if the committed region is malformed.
    pub fn purge_removed(&mut self) -> Result<usize, BufferError> {
        if self.open_frames > 0 {
            return Err(BufferError::OpenBuilder);
        }
        let mut read = 0;
        let mut keep = 0;
        let mut dropped = 0;
        while read < self.committed {
            let header = RecordHeader::read_at(&self.data[..self.committed], read)?;
            let size = header.padded_size();
            if header.flags.is_removed() {
                dropped += 1;
            } else {
                if keep != read {
                    self.data.copy_within(read..read + size, keep);
                }
                keep += size;
            }
            read += size;
        }
        if dropped > 0 {
            let tail = self.in_progress_len();
            self.data.copy_within(self.committed..self.written, keep);
            self.committed = keep;
            self.written = keep + tail;
            self.epoch += 1;
            debug!(dropped, committed = keep, "purged removed records");
        }
        Ok(dropped)
    }

    fn header_at(&self, offset: usize) -> Result<RecordHeader, BufferError> {
        if offset >= self.committed {
            return Err(BufferError::NoRecordAt { offset });
        }
        Ok(RecordHeader::read_at(self.committed_bytes(), offset)?)
    }

    // ── Nested buffers ───────────────────────────────────────────

    /// Whether spilled buffers are waiting to be taken.
    #[must_use]
    pub fn has_nested(&self) -> bool {
        !self.nested.is_empty()
    }

    /// Take the oldest spilled buffer. Spilled buffers hold records that
    /// were committed before the ones still in this buffer, so they must
    /// be delivered first.
    pub fn take_nested(&mut self) -> Option<Buffer> {
        self.nested.pop_front()
    }

    // ── Builder hooks ────────────────────────────────────────────

    pub(crate) fn frame_opened(&mut self) {
        self.open_frames += 1;
    }

    pub(crate) fn frame_closed(&mut self) {
        self.open_frames = self.open_frames.saturating_sub(1);
    }

    pub(crate) fn frames_aborted(&mut self, count: usize) {
        self.open_frames = self.open_frames.saturating_sub(count);
    }

    pub(crate) fn truncate_in_progress(&mut self, pos: usize) {
        self.written = self.committed + pos.min(self.in_progress_len());
    }

    /// In-progress bytes starting `pos` bytes after the committed boundary.
    pub(crate) fn in_progress_mut(&mut self, pos: usize) -> &mut [u8] {
        let start = (self.committed + pos).min(self.written);
        &mut self.data[start..self.written]
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("capacity", &self.capacity())
            .field("committed", &self.committed)
            .field("written", &self.written)
            .field("growth", &self.growth)
            .field("open_frames", &self.open_frames)
            .field("nested", &self.nested.len())
            .finish()
    }
}
