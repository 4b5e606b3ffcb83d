use geoarena_types::ItemType;
use geoarena_wire::{RECORD_HEADER_SIZE, RecordHeader};

use crate::buffer::{Buffer, Mark};
use crate::error::{BufferError, BuilderError};

/// One open record on the builder stack.
///
/// `start` is measured from the buffer's committed boundary, which stays
/// put while a frame is open and survives reallocation and spilling.
#[derive(Clone, Copy, Debug)]
struct Frame {
    start: usize,
    kind: ItemType,
    has_child: bool,
}

/// Stack of open records being written into a [`Buffer`].
///
/// The stack enforces the nesting protocol: one outermost record at a
/// time, fixed fields before any nested record, children closed before
/// their parent. Every record's size field is patched when it closes, so
/// a closed record covers its header, its own fields and all of its
/// children. Closing the outermost record commits the buffer.
///
/// ```text
///   open(Way) ─► append_field(..) ─► open_nested(TagList)
///        │                                 │ append_field(tag)…
///        │                                 ▼
///        │                           close()  ← patches TagList size
///        ▼
///   close()  ← patches Way size, pads, commits
/// ```
///
/// [`abort`](Self::abort) throws away everything since the outermost
/// `open`, leaving the buffer as it was.
#[derive(Debug, Default)]
pub struct BuilderStack {
    frames: Vec<Frame>,
    mark: Option<Mark>,
}

impl BuilderStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open records.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Kind of the innermost open record.
    #[must_use]
    pub fn top_kind(&self) -> Option<ItemType> {
        self.frames.last().map(|f| f.kind)
    }

    /// Kind of the outermost open record.
    #[must_use]
    pub fn root_kind(&self) -> Option<ItemType> {
        self.frames.first().map(|f| f.kind)
    }

    /// Current size of the open record at `depth` (0 = outermost).
    #[must_use]
    pub fn open_size(&self, buffer: &Buffer, depth: usize) -> Option<usize> {
        self.frames
            .get(depth)
            .map(|f| buffer.in_progress_len() - f.start)
    }

    /// Start a new outermost record.
    ///
    /// # Errors
    ///
    /// [`BuilderError::AlreadyOpen`] if a record is open on this stack or
    /// any other stack writing to `buffer`, or [`BuilderError::Capacity`]
    /// if the header does not fit.
    pub fn open(&mut self, buffer: &mut Buffer, kind: ItemType) -> Result<(), BuilderError> {
        if self.is_open() || buffer.has_open_builder() {
            return Err(BuilderError::AlreadyOpen);
        }
        let mark = buffer.mark();
        if let Err(err) = self.push_frame(buffer, kind) {
            buffer.truncate_in_progress(mark.position());
            return Err(err);
        }
        self.mark = Some(mark);
        Ok(())
    }

    /// Start a record nested in the innermost open one. The parent is
    /// padded to alignment first and accepts no more fields afterwards.
    ///
    /// # Errors
    ///
    /// [`BuilderError::NotOpen`] without an open parent, or
    /// [`BuilderError::Capacity`]. On failure the parent is unchanged.
    pub fn open_nested(&mut self, buffer: &mut Buffer, kind: ItemType) -> Result<(), BuilderError> {
        if !self.is_open() {
            return Err(BuilderError::NotOpen);
        }
        let mark = buffer.mark();
        let result = buffer
            .pad_to_alignment()
            .map_err(BuilderError::from)
            .and_then(|()| self.push_frame(buffer, kind));
        if let Err(err) = result {
            buffer.truncate_in_progress(mark.position());
            return Err(err);
        }
        let parent = self.frames.len() - 2;
        self.frames[parent].has_child = true;
        Ok(())
    }

    /// Append raw field bytes to the innermost open record.
    ///
    /// # Errors
    ///
    /// - [`BuilderError::NotOpen`] without an open record.
    /// - [`BuilderError::FieldAfterNested`] once the record has a child.
    /// - [`BuilderError::Capacity`] if the bytes do not fit.
    pub fn append_field(&mut self, buffer: &mut Buffer, bytes: &[u8]) -> Result<(), BuilderError> {
        let top = self.frames.last().ok_or(BuilderError::NotOpen)?;
        if top.has_child {
            return Err(BuilderError::FieldAfterNested { kind: top.kind });
        }
        buffer.write(bytes)?;
        Ok(())
    }

    /// Close the innermost open record. When that was the outermost
    /// record, the buffer commits and the record's offset is returned.
    ///
    /// # Errors
    ///
    /// [`BuilderError::NotOpen`], [`BuilderError::Capacity`] if the
    /// trailing padding does not fit, or a buffer error from the commit.
    pub fn close(&mut self, buffer: &mut Buffer) -> Result<Option<usize>, BuilderError> {
        let frame = *self.frames.last().ok_or(BuilderError::NotOpen)?;
        let size = buffer.in_progress_len() - frame.start;
        let byte_size = u32::try_from(size).map_err(|_| BufferError::RecordTooLarge { size })?;
        RecordHeader::patch_byte_size(buffer.in_progress_mut(frame.start), byte_size)?;
        buffer.pad_to_alignment()?;

        self.frames.pop();
        buffer.frame_closed();
        if self.frames.is_empty() {
            self.mark = None;
            return Ok(Some(buffer.commit()?));
        }
        Ok(None)
    }

    /// Discard every open record and all bytes written since the
    /// outermost `open`.
    pub fn abort(&mut self, buffer: &mut Buffer) {
        if let Some(mark) = self.mark.take() {
            buffer.truncate_in_progress(mark.position());
        }
        buffer.frames_aborted(self.frames.len());
        self.frames.clear();
    }

    /// Make sure the innermost open record is a `kind` collection directly
    /// under the outermost record, closing a different open collection
    /// first and opening a new one if needed.
    ///
    /// # Errors
    ///
    /// [`BuilderError::InvalidChild`] if the outermost record cannot hold
    /// a `kind`, plus whatever [`open_nested`](Self::open_nested) reports.
    pub fn ensure_child(&mut self, buffer: &mut Buffer, kind: ItemType) -> Result<(), BuilderError> {
        let root = self.root_kind().ok_or(BuilderError::NotOpen)?;
        if !accepts_child(root, kind) {
            return Err(BuilderError::InvalidChild {
                parent: root,
                child: kind,
            });
        }
        while self.depth() > 1 {
            if self.top_kind() == Some(kind) {
                return Ok(());
            }
            self.close(buffer)?;
        }
        self.open_nested(buffer, kind)
    }

    /// Close every nested record, leaving only the outermost one open.
    ///
    /// # Errors
    ///
    /// Same as [`close`](Self::close).
    pub fn close_children(&mut self, buffer: &mut Buffer) -> Result<(), BuilderError> {
        while self.depth() > 1 {
            self.close(buffer)?;
        }
        Ok(())
    }

    fn push_frame(&mut self, buffer: &mut Buffer, kind: ItemType) -> Result<(), BuilderError> {
        let start = buffer.in_progress_len();
        let mut header = [0u8; RECORD_HEADER_SIZE];
        RecordHeader::new(kind.wire_id()).write_to(&mut header)?;
        buffer.write(&header)?;
        buffer.frame_opened();
        self.frames.push(Frame {
            start,
            kind,
            has_child: false,
        });
        Ok(())
    }
}

fn accepts_child(root: ItemType, child: ItemType) -> bool {
    match child {
        ItemType::TagList => root.is_entity(),
        ItemType::WayNodeList => root == ItemType::Way,
        ItemType::RelationMemberList => root == ItemType::Relation,
        ItemType::OuterRing | ItemType::InnerRing => root.is_object(),
        _ => false,
    }
}
