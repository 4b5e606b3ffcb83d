//! The arena stream format: a short preamble followed by length-prefixed
//! transport frames, one per buffer.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────┐
//! │ [4 bytes]    │ magic "GARN"                              │
//! │ [1 byte]     │ version (1)                               │
//! │ [3 bytes]    │ reserved (0)                              │
//! │ varint + N   │ frame 0 (see geoarena_codec::transport)   │
//! │ varint + N   │ frame 1 ...                               │
//! └──────────────┴───────────────────────────────────────────┘
//! ```
//!
//! [`FrameDecoder`] turns every frame into a [`DecodeEvent::Blob`], so the
//! frames are inflated on the worker pool while the producer keeps reading.

use std::io::{self, BufReader, ErrorKind, Read, Write};

use geoarena_buffer::{Buffer, GrowthPolicy};
use geoarena_codec::{Codec, MAX_FRAME_RAW_SIZE, encode_buffer};
use geoarena_wire::WireError;
use geoarena_wire::varint::{MAX_VARINT_BYTES, push_varint};
use tracing::trace;

use crate::decoder::{BlobTask, DecodeEvent, Decoder};
use crate::error::PipelineError;

pub const STREAM_MAGIC: [u8; 4] = *b"GARN";
pub const STREAM_VERSION: u8 = 1;
const PREAMBLE_SIZE: usize = 8;
/// Space reserved for a frame before its bytes arrive.
const INITIAL_FRAME_CAPACITY: usize = 64 * 1024;

fn preamble() -> [u8; PREAMBLE_SIZE] {
    let mut out = [0u8; PREAMBLE_SIZE];
    out[..4].copy_from_slice(&STREAM_MAGIC);
    out[4] = STREAM_VERSION;
    out
}

/// Writes buffers as an arena stream.
pub struct FrameWriter<W: Write> {
    writer: W,
    codec: Box<dyn Codec>,
    frames: usize,
}

impl<W: Write> FrameWriter<W> {
    /// Write the preamble and return a writer for the frames.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Io`] if the preamble cannot be written.
    pub fn new(mut writer: W, codec: Box<dyn Codec>) -> Result<Self, PipelineError> {
        writer.write_all(&preamble())?;
        Ok(Self {
            writer,
            codec,
            frames: 0,
        })
    }

    /// Append the committed records of `buffer` as one frame. Empty
    /// buffers are skipped.
    ///
    /// # Errors
    ///
    /// Codec or I/O failures.
    pub fn write_buffer(&mut self, buffer: &Buffer) -> Result<(), PipelineError> {
        if buffer.is_empty() {
            return Ok(());
        }
        let frame = encode_buffer(buffer, self.codec.as_ref())?;
        let mut prefix = Vec::with_capacity(MAX_VARINT_BYTES);
        push_varint(&mut prefix, frame.len() as u64);
        self.writer.write_all(&prefix)?;
        self.writer.write_all(&frame)?;
        self.frames += 1;
        trace!(frame = self.frames, bytes = frame.len(), "wrote frame");
        Ok(())
    }

    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Flush and hand back the underlying writer.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Io`] if flushing fails.
    pub fn finish(mut self) -> Result<W, PipelineError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Reads an arena stream, emitting one blob event per frame.
pub struct FrameDecoder<R: Read> {
    reader: BufReader<R>,
    growth: GrowthPolicy,
    started: bool,
    done: bool,
    position: u64,
}

impl<R: Read> FrameDecoder<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_growth(reader, GrowthPolicy::AutoGrow)
    }

    /// Decoded buffers get `growth` as their policy.
    #[must_use]
    pub fn with_growth(reader: R, growth: GrowthPolicy) -> Self {
        Self {
            reader: BufReader::new(reader),
            growth,
            started: false,
            done: false,
            position: 0,
        }
    }

    fn read_preamble(&mut self) -> Result<(), PipelineError> {
        let mut raw = [0u8; PREAMBLE_SIZE];
        self.reader.read_exact(&mut raw).map_err(|e| self.eof_as_format(e, "stream preamble"))?;
        if raw[..4] != STREAM_MAGIC {
            return Err(PipelineError::format("not an arena stream", 0));
        }
        if raw[4] != STREAM_VERSION {
            return Err(PipelineError::format(
                format!("unsupported arena stream version {}", raw[4]),
                0,
            ));
        }
        self.position = PREAMBLE_SIZE as u64;
        Ok(())
    }

    /// `None` on a clean end of stream before the first byte.
    fn read_frame_len(&mut self) -> Result<Option<u64>, PipelineError> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let mut byte = [0u8; 1];
            match self.reader.read_exact(&mut byte) {
                Ok(()) => {}
                Err(e) if i == 0 && e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(self.eof_as_format(e, "frame length")),
            }
            self.position += 1;
            value |= u64::from(byte[0] & 0x7F) << (7 * i);
            if byte[0] & 0x80 == 0 {
                return Ok(Some(value));
            }
        }
        Err(PipelineError::format(
            WireError::VarintTooLong.to_string(),
            self.position,
        ))
    }

    fn eof_as_format(&self, err: io::Error, what: &str) -> PipelineError {
        if err.kind() == ErrorKind::UnexpectedEof {
            PipelineError::format(format!("truncated {what}"), self.position)
        } else {
            err.into()
        }
    }
}

impl<R: Read + Send> Decoder for FrameDecoder<R> {
    fn next_event(&mut self) -> Result<Option<DecodeEvent>, PipelineError> {
        if !self.started {
            self.started = true;
            self.read_preamble()?;
            return Ok(Some(DecodeEvent::EndOfHeader));
        }
        if self.done {
            return Ok(None);
        }
        let Some(len) = self.read_frame_len()? else {
            self.done = true;
            return Ok(Some(DecodeEvent::EndOfInput));
        };
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= MAX_FRAME_RAW_SIZE)
            .ok_or_else(|| {
                PipelineError::format(format!("frame of {len} bytes is too large"), self.position)
            })?;
        let mut frame = Vec::with_capacity(len.min(INITIAL_FRAME_CAPACITY));
        let result = (&mut self.reader).take(len as u64).read_to_end(&mut frame);
        let read = result.map_err(|e| self.eof_as_format(e, "frame"))?;
        self.position += read as u64;
        if read != len {
            return Err(PipelineError::format(
                format!("truncated frame: {read} of {len} bytes"),
                self.position,
            ));
        }
        Ok(Some(DecodeEvent::Blob(BlobTask::from_frame(frame, self.growth))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoarena_buffer::BuilderStack;
    use geoarena_codec::{NoCodec, ZstdCodec};
    use geoarena_types::{Location, ObjectFields};

    fn node_buffer(ids: std::ops::Range<i64>) -> Buffer {
        let mut buffer = Buffer::new(1024, GrowthPolicy::AutoGrow);
        let mut stack = BuilderStack::new();
        for id in ids {
            stack
                .open_node(&mut buffer, &ObjectFields::new(id), Location::new_raw(1, 1), "")
                .unwrap();
            stack.finish(&mut buffer).unwrap();
        }
        buffer
    }

    fn stream(buffers: &[Buffer]) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new(), Box::new(ZstdCodec::default())).unwrap();
        for buffer in buffers {
            writer.write_buffer(buffer).unwrap();
        }
        writer.write_buffer(&Buffer::new(8, GrowthPolicy::Fixed)).unwrap();
        assert_eq!(writer.frames(), buffers.len());
        writer.finish().unwrap()
    }

    #[test]
    fn frames_become_blobs() {
        let bytes = stream(&[node_buffer(1..4), node_buffer(4..6)]);
        let mut decoder = FrameDecoder::new(bytes.as_slice());

        assert!(matches!(
            decoder.next_event().unwrap(),
            Some(DecodeEvent::EndOfHeader)
        ));
        let mut counts = Vec::new();
        loop {
            match decoder.next_event().unwrap() {
                Some(DecodeEvent::Blob(task)) => counts.push(task.run().unwrap().records().count()),
                Some(DecodeEvent::EndOfInput) => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(counts, vec![3, 2]);
        assert!(decoder.next_event().unwrap().is_none());
    }

    #[test]
    fn bad_magic() {
        let mut decoder = FrameDecoder::new(&b"NOTARENA"[..]);
        assert!(matches!(
            decoder.next_event(),
            Err(PipelineError::Format { position: 0, .. })
        ));
    }

    #[test]
    fn truncated_frame() {
        let mut bytes = preamble().to_vec();
        let mut writer_bytes = Vec::new();
        let frame = encode_buffer(&node_buffer(1..2), &NoCodec).unwrap();
        push_varint(&mut writer_bytes, frame.len() as u64);
        writer_bytes.extend_from_slice(&frame[..frame.len() / 2]);
        bytes.extend(writer_bytes);

        let mut decoder = FrameDecoder::new(bytes.as_slice());
        decoder.next_event().unwrap();
        let err = decoder.next_event().unwrap_err();
        assert!(err.to_string().contains("truncated frame"), "{err}");
    }

    #[test]
    fn oversized_declared_length_reads_only_what_is_there() {
        let mut bytes = preamble().to_vec();
        push_varint(&mut bytes, MAX_FRAME_RAW_SIZE as u64);
        bytes.extend_from_slice(&[0x08, 0x00, 1, 2]);

        let mut decoder = FrameDecoder::new(bytes.as_slice());
        decoder.next_event().unwrap();
        let err = decoder.next_event().unwrap_err();
        assert!(err.to_string().contains("truncated frame: 4 of"), "{err}");
    }
}
