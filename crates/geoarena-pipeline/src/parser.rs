//! Producer side of a pipeline: drives a [`Decoder`] and turns its events
//! into committed buffers on the queue.
//!
//! ```text
//!   AwaitingHeader ──first non-header event──▶ Streaming
//!         │                                        │
//!         │ empty read_types                       │ EndOfInput
//!         ▼                                        ▼
//!       Done ◀──────────── queue closed ◀──────── Draining
//!
//!   any state ──error──▶ Errored (committed data flushed, then Failed)
//! ```

use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use geoarena_buffer::{Buffer, BuilderStack};
use geoarena_types::{EntityBits, ItemType, NodeRef, StreamHeader};
use geoarena_wire::DiffIndicator;
use tracing::{debug, info, trace, warn};

use crate::attributes::EntityAttributes;
use crate::config::{PipelineConfig, Segregation};
use crate::decoder::{BlobTask, ChangeSection, DecodeEvent, Decoder};
use crate::error::PipelineError;
use crate::oneshot::{Receiver, Sender};
use crate::pool::Pool;
use crate::queue::Queue;

pub(crate) type HeaderResult = Result<StreamHeader, PipelineError>;

/// What the consumer finds in the queue, in stream order.
pub(crate) enum QueueItem {
    Ready(Buffer),
    /// A blob still being decoded on the pool.
    Deferred(Receiver<Result<Buffer, PipelineError>>),
    /// Always the last item.
    Failed(PipelineError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParserState {
    AwaitingHeader,
    Streaming,
    Draining,
    Done,
    Errored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

enum Current {
    Idle,
    /// Inside an entity whose kind is not in `read_types`.
    Ignored,
    /// Inside an entity being built. `log` holds its events so far, for
    /// replay into a fresh buffer.
    Building {
        kind: ItemType,
        id: i64,
        diff: DiffIndicator,
        log: Vec<DecodeEvent>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SegregationKey {
    kind: ItemType,
    section: Option<ChangeSection>,
}

pub(crate) struct Parser {
    decoder: Box<dyn Decoder>,
    config: PipelineConfig,
    queue: Arc<Queue<QueueItem>>,
    cancel: Arc<AtomicBool>,
    header_tx: Option<Sender<HeaderResult>>,
    header: StreamHeader,
    state: ParserState,
    buffer: Buffer,
    stack: BuilderStack,
    current: Current,
    section: ChangeSection,
    last_key: Option<SegregationKey>,
    pool: Option<Pool>,
    position: u64,
}

impl Parser {
    pub fn new(
        decoder: Box<dyn Decoder>,
        config: PipelineConfig,
        queue: Arc<Queue<QueueItem>>,
        cancel: Arc<AtomicBool>,
        header_tx: Sender<HeaderResult>,
    ) -> Self {
        let buffer = Buffer::new(config.buffer_capacity, config.growth);
        Self {
            decoder,
            config,
            queue,
            cancel,
            header_tx: Some(header_tx),
            header: StreamHeader::new(),
            state: ParserState::AwaitingHeader,
            buffer,
            stack: BuilderStack::new(),
            current: Current::Idle,
            section: ChangeSection::default(),
            last_key: None,
            pool: None,
            position: 0,
        }
    }

    /// Run until the input ends, fails or is cancelled. The queue is
    /// closed on every path out of here.
    pub fn run(&mut self) -> ParserState {
        debug!(
            read_types = self.config.read_types.raw(),
            capacity = self.config.buffer_capacity,
            "pipeline started"
        );
        loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break,
                Err(err) => {
                    self.fail(err);
                    break;
                }
            }
        }
        self.state
    }

    fn step(&mut self) -> Result<Flow, PipelineError> {
        if self.cancel.load(Ordering::Acquire) {
            self.cancelled();
            return Ok(Flow::Stop);
        }
        let event = self
            .decoder
            .next_event()?
            .unwrap_or(DecodeEvent::EndOfInput);
        self.position += 1;
        self.handle(event)
    }

    fn handle(&mut self, event: DecodeEvent) -> Result<Flow, PipelineError> {
        if event.is_header_event() {
            if self.state != ParserState::AwaitingHeader {
                return Err(self.format_error("header data after the header was closed"));
            }
            self.update_header(event);
            return Ok(Flow::Continue);
        }
        if self.deliver_header() == Flow::Stop {
            return Ok(Flow::Stop);
        }

        match event {
            DecodeEvent::EndOfHeader => Ok(Flow::Continue),
            DecodeEvent::Section(section) => self.enter_section(section),
            DecodeEvent::Blob(task) => self.submit_blob(task),
            DecodeEvent::EndOfInput => self.finish_input(),
            other => self.entity_event(other),
        }
    }

    fn update_header(&mut self, event: DecodeEvent) {
        match event {
            DecodeEvent::HeaderAttribute { key, value } => {
                self.header.set(key, value);
            }
            DecodeEvent::Bounds(bounds) => {
                self.header.add_box(bounds);
            }
            DecodeEvent::Generator(generator) => {
                self.header.set_generator(generator);
            }
            DecodeEvent::MultipleVersions(value) => {
                self.header.set_multiple_object_versions(value);
            }
            _ => {}
        }
    }

    /// Hand the header to the consumer the first time it is called.
    fn deliver_header(&mut self) -> Flow {
        if self.state != ParserState::AwaitingHeader {
            return Flow::Continue;
        }
        if let Some(tx) = self.header_tx.take() {
            tx.send(Ok(self.header.clone()));
        }
        debug!(boxes = self.header.boxes().len(), "header delivered");

        if self.config.read_types.is_empty() {
            debug!("no entity kinds requested, skipping the body");
            self.state = ParserState::Done;
            self.queue.close();
            return Flow::Stop;
        }
        self.state = ParserState::Streaming;
        Flow::Continue
    }

    fn enter_section(&mut self, section: ChangeSection) -> Result<Flow, PipelineError> {
        if !matches!(self.current, Current::Idle) {
            return Err(self.format_error("section change inside an entity"));
        }
        if section != self.section {
            trace!(?section, "entering section");
            self.section = section;
        }
        Ok(Flow::Continue)
    }

    // ── Entities ────────────────────────────────────────────────────────

    fn entity_event(&mut self, event: DecodeEvent) -> Result<Flow, PipelineError> {
        if let DecodeEvent::BeginEntity {
            kind,
            attributes,
            diff,
        } = &event
        {
            let (kind, diff) = (*kind, *diff);
            if !matches!(self.current, Current::Idle) {
                return Err(self.format_error("entity begins inside another entity"));
            }
            if !kind.is_entity() {
                return Err(self.format_error(format!("{kind} is not an entity kind")));
            }
            if !self.config.read_types.includes(kind) {
                self.current = Current::Ignored;
                return Ok(Flow::Continue);
            }
            self.segregate(kind)?;
            let id = attributes
                .iter()
                .find(|(key, _)| key == "id")
                .and_then(|(_, value)| value.trim().parse().ok())
                .unwrap_or_default();
            self.current = Current::Building {
                kind,
                id,
                diff,
                log: Vec::new(),
            };
        } else {
            match self.current {
                Current::Idle => {
                    return Err(self.format_error("entity data outside of an entity"));
                }
                Current::Ignored => {
                    if matches!(event, DecodeEvent::EndEntity) {
                        self.current = Current::Idle;
                    }
                    return Ok(Flow::Continue);
                }
                Current::Building { .. } => {}
            }
        }
        self.build(event)?;
        Ok(Flow::Continue)
    }

    fn build(&mut self, event: DecodeEvent) -> Result<(), PipelineError> {
        let result = self.apply(&event);
        if let Current::Building { log, .. } = &mut self.current {
            log.push(event);
        }
        let committed = match result {
            Ok(committed) => committed,
            Err(err) if err.is_buffer_full() => self.replay_entity()?,
            Err(err) => return Err(err),
        };
        if let Some(offset) = committed {
            self.entity_committed(offset)?;
        }
        Ok(())
    }

    /// Returns the committed offset when `event` closes the entity.
    fn apply(&mut self, event: &DecodeEvent) -> Result<Option<usize>, PipelineError> {
        let buffer = &mut self.buffer;
        match event {
            DecodeEvent::BeginEntity {
                kind, attributes, ..
            } => {
                let mut parsed = EntityAttributes::parse(
                    *kind,
                    attributes,
                    self.config.read_metadata,
                    self.position,
                )?;
                if self.section == ChangeSection::Delete {
                    parsed.object.visible = false;
                }
                if *kind == ItemType::Changeset {
                    self.stack
                        .open_changeset(buffer, &parsed.changeset, &parsed.user)?;
                } else {
                    self.stack.open_object(
                        buffer,
                        *kind,
                        &parsed.object,
                        parsed.location,
                        &parsed.user,
                    )?;
                }
                Ok(None)
            }
            DecodeEvent::Tag { key, value } => {
                self.stack.add_tag(buffer, key, value)?;
                Ok(None)
            }
            DecodeEvent::Reference { id, location } => {
                self.stack
                    .add_node_ref(buffer, NodeRef::new(*id, *location))?;
                Ok(None)
            }
            DecodeEvent::Member { kind, id, role } => {
                self.stack.add_member(buffer, *kind, *id, role)?;
                Ok(None)
            }
            DecodeEvent::EndEntity => Ok(self.stack.finish(buffer)?),
            _ => Ok(None),
        }
    }

    /// The open entity did not fit. Roll it back, flush what is committed
    /// and build it again from its log in an empty buffer.
    fn replay_entity(&mut self) -> Result<Option<usize>, PipelineError> {
        self.stack.abort(&mut self.buffer);
        let Current::Building { kind, id, log, .. } = &mut self.current else {
            return Ok(None);
        };
        let (kind, id) = (*kind, *id);
        let log = mem::take(log);
        let too_big = PipelineError::Capacity {
            capacity: self.buffer.capacity(),
            kind,
            id,
        };
        if self.buffer.is_empty() {
            return Err(too_big);
        }

        debug!(%kind, id, "entity does not fit, moving it to a fresh buffer");
        self.flush("capacity")?;
        let mut committed = None;
        for event in &log {
            match self.apply(event) {
                Ok(offset) => committed = committed.or(offset),
                Err(err) => {
                    self.stack.abort(&mut self.buffer);
                    return Err(if err.is_buffer_full() { too_big } else { err });
                }
            }
        }
        if let Current::Building { log: slot, .. } = &mut self.current {
            *slot = log;
        }
        Ok(committed)
    }

    fn entity_committed(&mut self, offset: usize) -> Result<(), PipelineError> {
        let Current::Building { kind, id, diff, .. } =
            mem::replace(&mut self.current, Current::Idle)
        else {
            return Ok(());
        };
        if diff != DiffIndicator::None {
            self.buffer.set_diff(offset, diff)?;
        }
        self.last_key = Some(self.segregation_key(kind));
        trace!(%kind, id, offset, "entity committed");

        self.push_nested()?;
        if self.buffer.free() < self.config.flush_threshold {
            self.flush("threshold")?;
        }
        Ok(())
    }

    fn segregation_key(&self, kind: ItemType) -> SegregationKey {
        SegregationKey {
            kind,
            section: (self.config.segregation == Segregation::ByTypeAndChange)
                .then_some(self.section),
        }
    }

    fn segregate(&mut self, kind: ItemType) -> Result<(), PipelineError> {
        if self.config.segregation == Segregation::None {
            return Ok(());
        }
        let key = self.segregation_key(kind);
        match self.last_key {
            Some(last) if last != key => {
                debug!(from = %last.kind, to = %kind, "segregation boundary");
                self.flush("segregation")
            }
            _ => Ok(()),
        }
    }

    // ── Blobs ───────────────────────────────────────────────────────────

    fn submit_blob(&mut self, task: BlobTask) -> Result<Flow, PipelineError> {
        if !matches!(self.current, Current::Idle) {
            return Err(self.format_error("blob inside an entity"));
        }
        self.flush("blob")?;
        self.last_key = None;

        if self.pool.is_none() {
            let threads = self.config.pool_threads.unwrap_or_else(Pool::default_size);
            self.pool = Some(Pool::new(threads)?);
        }
        let Some(pool) = &self.pool else {
            return Ok(Flow::Continue);
        };
        let mask = self.config.read_types;
        let receiver = pool.submit(move || {
            let mut buffer = task.run()?;
            retain_kinds(&mut buffer, mask)?;
            Ok(buffer)
        });
        self.push(QueueItem::Deferred(receiver))?;
        Ok(Flow::Continue)
    }

    // ── Output ──────────────────────────────────────────────────────────

    /// Queue the current buffer if it holds anything and start a new one.
    fn flush(&mut self, reason: &'static str) -> Result<(), PipelineError> {
        self.push_nested()?;
        if self.buffer.is_empty() {
            return Ok(());
        }
        let fresh = Buffer::new(self.config.buffer_capacity, self.config.growth);
        let full = mem::replace(&mut self.buffer, fresh);
        debug!(committed = full.committed(), reason, "flushing buffer");
        self.push(QueueItem::Ready(full))
    }

    /// Queue buffers split off by a `Spill` buffer, oldest first.
    fn push_nested(&mut self) -> Result<(), PipelineError> {
        while let Some(nested) = self.buffer.take_nested() {
            debug!(committed = nested.committed(), reason = "spill", "flushing buffer");
            self.push(QueueItem::Ready(nested))?;
        }
        Ok(())
    }

    fn push(&self, item: QueueItem) -> Result<(), PipelineError> {
        self.queue
            .push(item)
            .map_err(|_| PipelineError::Disconnected)
    }

    fn finish_input(&mut self) -> Result<Flow, PipelineError> {
        if !matches!(self.current, Current::Idle) {
            return Err(self.format_error("input ended inside an entity"));
        }
        self.state = ParserState::Draining;
        self.flush("end of input")?;
        self.queue.close();
        self.state = ParserState::Done;
        debug!(events = self.position, "pipeline finished");
        Ok(Flow::Stop)
    }

    // ── Failure ─────────────────────────────────────────────────────────

    fn format_error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::format(message, self.position)
    }

    fn fail(&mut self, err: PipelineError) {
        if self.cancel.load(Ordering::Acquire) {
            self.cancelled();
            return;
        }
        warn!(error = %err, position = self.position, "pipeline failed");
        self.state = ParserState::Errored;
        self.stack.abort(&mut self.buffer);
        self.current = Current::Idle;
        if let Err(flush_err) = self.flush("error") {
            debug!(error = %flush_err, "could not flush before failing");
        }
        if let Some(tx) = self.header_tx.take() {
            tx.send(Err(err.clone()));
        }
        if self.queue.push(QueueItem::Failed(err)).is_err() {
            debug!("consumer gone, dropping the error");
        }
        self.queue.close();
    }

    fn cancelled(&mut self) {
        info!(position = self.position, "pipeline cancelled");
        self.stack.abort(&mut self.buffer);
        self.current = Current::Idle;
        if let Err(err) = self.flush("cancel") {
            debug!(error = %err, "could not flush after cancel");
        }
        if let Some(tx) = self.header_tx.take() {
            tx.send(Ok(self.header.clone()));
        }
        self.state = ParserState::Done;
        self.queue.close();
    }
}

/// Drop the entities of kinds outside `mask` from a decoded blob.
fn retain_kinds(buffer: &mut Buffer, mask: EntityBits) -> Result<(), PipelineError> {
    if mask == EntityBits::ALL {
        return Ok(());
    }
    let unwanted: Vec<usize> = buffer
        .records()
        .filter(|record| {
            let kind = record.item_type();
            kind.is_entity() && !mask.includes(kind)
        })
        .map(|record| record.offset())
        .collect();
    if unwanted.is_empty() {
        return Ok(());
    }
    for offset in unwanted {
        buffer.set_removed(offset, true)?;
    }
    let purged = buffer.purge_removed()?;
    trace!(purged, "filtered blob by entity kind");
    Ok(())
}
