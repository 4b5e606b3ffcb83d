use std::fmt;

use geoarena_buffer::{Buffer, GrowthPolicy};
use geoarena_codec::decode_buffer;
use geoarena_types::{Bounds, ItemType, Location};
use geoarena_wire::DiffIndicator;

use crate::error::PipelineError;

/// Sections of a change file. Entities in a `Delete` section are stored
/// as invisible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChangeSection {
    #[default]
    Create,
    Modify,
    Delete,
}

/// Work that turns an already framed chunk of input into a buffer on a
/// pool thread.
pub struct BlobTask(Box<dyn FnOnce() -> Result<Buffer, PipelineError> + Send>);

impl BlobTask {
    pub fn new<F>(task: F) -> Self
    where
        F: FnOnce() -> Result<Buffer, PipelineError> + Send + 'static,
    {
        Self(Box::new(task))
    }

    /// A task that inflates one transport frame.
    #[must_use]
    pub fn from_frame(frame: Vec<u8>, growth: GrowthPolicy) -> Self {
        Self::new(move || Ok(decode_buffer(&frame, growth)?))
    }

    /// # Errors
    ///
    /// Whatever the task reports.
    pub fn run(self) -> Result<Buffer, PipelineError> {
        (self.0)()
    }
}

impl fmt::Debug for BlobTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlobTask(..)")
    }
}

/// One step of a decoded input stream.
///
/// Header events come first; the first other event closes the header.
/// Entities are bracketed by `BeginEntity` / `EndEntity` and cannot nest.
/// Attributes are passed as text, exactly as the input spells them.
#[derive(Debug)]
pub enum DecodeEvent {
    HeaderAttribute { key: String, value: String },
    Bounds(Bounds),
    Generator(String),
    MultipleVersions(bool),
    EndOfHeader,
    Section(ChangeSection),
    BeginEntity {
        kind: ItemType,
        attributes: Vec<(String, String)>,
        diff: DiffIndicator,
    },
    Tag { key: String, value: String },
    Reference { id: i64, location: Location },
    Member { kind: ItemType, id: i64, role: String },
    EndEntity,
    Blob(BlobTask),
    EndOfInput,
}

impl DecodeEvent {
    /// `BeginEntity` without a diff marker.
    pub fn begin<K, V>(kind: ItemType, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::BeginEntity {
            kind,
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            diff: DiffIndicator::None,
        }
    }

    pub fn tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Tag {
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn node_ref(id: i64) -> Self {
        Self::Reference {
            id,
            location: Location::undefined(),
        }
    }

    pub fn member(kind: ItemType, id: i64, role: impl Into<String>) -> Self {
        Self::Member {
            kind,
            id,
            role: role.into(),
        }
    }

    /// Whether this event may only appear before the header is closed.
    #[must_use]
    pub fn is_header_event(&self) -> bool {
        matches!(
            self,
            Self::HeaderAttribute { .. }
                | Self::Bounds(_)
                | Self::Generator(_)
                | Self::MultipleVersions(_)
        )
    }
}

/// Source of decode events for one input stream.
///
/// `Ok(None)` means the input is exhausted and is treated like
/// [`DecodeEvent::EndOfInput`].
pub trait Decoder: Send {
    /// # Errors
    ///
    /// Malformed input ([`PipelineError::Format`]) or read failures
    /// ([`PipelineError::Io`]).
    fn next_event(&mut self) -> Result<Option<DecodeEvent>, PipelineError>;
}

/// Replays a prepared list of events, optionally followed by an error.
#[derive(Debug)]
pub struct EventListDecoder {
    events: std::vec::IntoIter<DecodeEvent>,
    failure: Option<PipelineError>,
}

impl EventListDecoder {
    #[must_use]
    pub fn new(events: Vec<DecodeEvent>) -> Self {
        Self {
            events: events.into_iter(),
            failure: None,
        }
    }

    /// Report `error` once the events run out.
    #[must_use]
    pub fn then_fail(mut self, error: PipelineError) -> Self {
        self.failure = Some(error);
        self
    }
}

impl Decoder for EventListDecoder {
    fn next_event(&mut self) -> Result<Option<DecodeEvent>, PipelineError> {
        if let Some(event) = self.events.next() {
            return Ok(Some(event));
        }
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_decoder_replays_then_fails() {
        let mut decoder = EventListDecoder::new(vec![
            DecodeEvent::EndOfHeader,
            DecodeEvent::begin(ItemType::Node, [("id", "1")]),
            DecodeEvent::EndEntity,
        ])
        .then_fail(PipelineError::format("bad byte", 3));

        assert!(matches!(
            decoder.next_event(),
            Ok(Some(DecodeEvent::EndOfHeader))
        ));
        match decoder.next_event() {
            Ok(Some(DecodeEvent::BeginEntity {
                kind, attributes, ..
            })) => {
                assert_eq!(kind, ItemType::Node);
                assert_eq!(attributes, vec![("id".to_string(), "1".to_string())]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(decoder.next_event().unwrap().is_some());
        assert!(matches!(
            decoder.next_event(),
            Err(PipelineError::Format { position: 3, .. })
        ));
        assert!(decoder.next_event().unwrap().is_none());
    }

    #[test]
    fn header_events() {
        assert!(DecodeEvent::Generator("x".into()).is_header_event());
        assert!(!DecodeEvent::EndOfHeader.is_header_event());
        assert!(!DecodeEvent::tag("a", "b").is_header_event());
    }

    #[test]
    fn blob_task_runs() {
        let task = BlobTask::new(|| Ok(Buffer::new(64, GrowthPolicy::Fixed)));
        assert_eq!(format!("{task:?}"), "BlobTask(..)");
        assert_eq!(task.run().unwrap().capacity(), 64);
    }
}
