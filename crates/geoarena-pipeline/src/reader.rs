//! Consumer side of a pipeline.
//!
//! ```text
//!   producer thread                       caller
//!   ───────────────                       ──────
//!   Decoder ─▶ Parser ─▶ Queue<QueueItem> ─▶ Reader::read()
//!                 │                            ▲
//!                 └──── header (one-shot) ─────┘ Reader::header()
//! ```
//!
//! The queue is bounded by [`PipelineConfig::max_queue_len`]: a producer
//! that runs ahead of the consumer blocks until a buffer is taken.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use geoarena_buffer::Buffer;
use geoarena_types::StreamHeader;
use tracing::{debug, error};

use crate::config::PipelineConfig;
use crate::decoder::Decoder;
use crate::error::PipelineError;
use crate::format::FileFormat;
use crate::oneshot::{self, Receiver};
use crate::parser::{HeaderResult, Parser, QueueItem};
use crate::pool::panic_message;
use crate::queue::Queue;
use crate::registry::{FormatRegistry, Input};

/// Streams buffers decoded on a background thread.
///
/// Buffers come out in input order. The first error ends the stream:
/// [`read`](Self::read) returns it once, after every buffer committed
/// before it, and `Ok(None)` from then on. Dropping the reader cancels
/// the producer and waits for it to stop.
pub struct Reader {
    queue: Arc<Queue<QueueItem>>,
    header_rx: Option<Receiver<HeaderResult>>,
    header: Option<HeaderResult>,
    cancel: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    finished: bool,
}

impl Reader {
    /// Start a producer thread that feeds `decoder` through the pipeline.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Io`] if the thread cannot be spawned.
    pub fn open(decoder: Box<dyn Decoder>, config: PipelineConfig) -> Result<Self, PipelineError> {
        let queue = Arc::new(Queue::new(config.max_queue_len));
        let cancel = Arc::new(AtomicBool::new(false));
        let (header_tx, header_rx) = oneshot::channel();
        let parser = Parser::new(
            decoder,
            config,
            Arc::clone(&queue),
            Arc::clone(&cancel),
            header_tx,
        );

        let producer_queue = Arc::clone(&queue);
        let producer = thread::Builder::new()
            .name("geoarena-producer".to_string())
            .spawn(move || produce(parser, &producer_queue))?;

        Ok(Self {
            queue,
            header_rx: Some(header_rx),
            header: None,
            cancel,
            producer: Some(producer),
            finished: false,
        })
    }

    /// Open `input` with the decoder registered for `format` in the
    /// process-wide registry.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnsupportedFormat`] if no decoder is registered,
    /// or whatever the decoder constructor reports.
    pub fn open_format(
        format: FileFormat,
        input: Input,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        Self::with_registry(FormatRegistry::global(), format, input, config)
    }

    /// Like [`open_format`](Self::open_format) with an explicit registry.
    ///
    /// # Errors
    ///
    /// Same as [`open_format`](Self::open_format).
    pub fn with_registry(
        registry: &FormatRegistry,
        format: FileFormat,
        input: Input,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let decoder = registry.create(format, input)?;
        debug!(%format, "opening input");
        Self::open(decoder, config)
    }

    /// The stream header. Blocks until the producer has read it; later
    /// calls return the same value.
    ///
    /// # Errors
    ///
    /// The error that stopped the producer before the header was
    /// complete, or [`PipelineError::Disconnected`] if the producer
    /// died without reporting one. A cancelled pipeline yields the
    /// header fields read up to that point.
    pub fn header(&mut self) -> Result<StreamHeader, PipelineError> {
        if self.header.is_none() {
            let result = match self.header_rx.take() {
                Some(rx) => rx.wait().map_err(PipelineError::from).and_then(|header| header),
                None => Err(PipelineError::Disconnected),
            };
            self.header = Some(result);
        }
        match &self.header {
            Some(result) => result.clone(),
            None => Err(PipelineError::Disconnected),
        }
    }

    /// The next non-empty buffer, or `Ok(None)` at the end of the stream.
    /// Blocks while the producer is behind, and while a blob buffer is
    /// still being decoded on the pool.
    ///
    /// # Errors
    ///
    /// The first error the producer or a pool task hit.
    pub fn read(&mut self) -> Result<Option<Buffer>, PipelineError> {
        while !self.finished {
            let Some(item) = self.queue.pop() else {
                self.finished = true;
                break;
            };
            let resolved = match item {
                QueueItem::Ready(buffer) => Ok(buffer),
                QueueItem::Deferred(rx) => rx
                    .wait()
                    .map_err(PipelineError::from)
                    .and_then(|buffer| buffer),
                QueueItem::Failed(err) => Err(err),
            };
            match resolved {
                Ok(buffer) if buffer.is_empty() => {}
                Ok(buffer) => return Ok(Some(buffer)),
                Err(err) => {
                    self.finished = true;
                    self.cancel.store(true, Ordering::Release);
                    self.queue.close();
                    return Err(err);
                }
            }
        }
        Ok(None)
    }

    /// Buffers waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Ask the producer to stop after the current decode event. It
    /// flushes what it has committed and ends the stream; buffers already
    /// queued stay readable.
    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::AcqRel) {
            debug!("cancelling pipeline");
        }
    }

    /// Cancel the producer, discard everything still queued and wait for
    /// the producer thread to exit.
    ///
    /// The producer notices cancellation between decode events, so a
    /// decoder blocked on input delays this call until the read returns.
    pub fn close(&mut self) {
        self.cancel();
        self.finished = true;
        self.queue.close();
        while self.queue.try_pop().is_some() {}
        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                error!("producer thread could not be joined");
            }
        }
    }
}

impl Iterator for Reader {
    type Item = Result<Buffer, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.close();
    }
}

fn produce(mut parser: Parser, queue: &Queue<QueueItem>) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| parser.run()));
    match outcome {
        Ok(state) => debug!(?state, "producer exited"),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(%message, "producer panicked");
            if queue
                .push(QueueItem::Failed(PipelineError::WorkerPanicked { message }))
                .is_err()
            {
                debug!("consumer gone, dropping the panic");
            }
            queue.close();
        }
    }
}
