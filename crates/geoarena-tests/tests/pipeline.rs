//! End-to-end pipeline tests: scripted decode events in, buffers out.
//!
//! Each test opens a [`Reader`] on its own producer thread and drains it
//! from the test thread, so ordering, backpressure and error delivery are
//! exercised across the real thread boundary.

use std::io::Cursor;

use geoarena_buffer::GrowthPolicy;
use geoarena_codec::ZstdCodec;
use geoarena_pipeline::{
    ChangeSection, DecodeEvent, Decoder, EventListDecoder, FileFormat, FormatRegistry,
    FrameWriter, PipelineConfig, PipelineError, Reader, Segregation,
};
use geoarena_tests::{
    drain, entity_keys, first_object, node_buffer, node_events, relation_events, scripted,
    small_extract, way_events,
};
use geoarena_types::{EntityBits, ItemType, Location, Member, Tag};

fn with_header(body: Vec<Vec<DecodeEvent>>) -> Vec<DecodeEvent> {
    let mut events = vec![DecodeEvent::Generator("geoarena-tests".into())];
    events.extend(body.into_iter().flatten());
    events
}

fn ids(buffers: &[geoarena_buffer::Buffer]) -> Vec<i64> {
    buffers
        .iter()
        .flat_map(entity_keys)
        .map(|(_, id)| id)
        .collect()
}

// ── Building entities ─────────────────────────────────────────────────────────

#[test]
fn node_with_two_tags() {
    let events = with_header(vec![node_events(1, &[("amenity", "cafe"), ("name", "Blue")])]);
    let (buffers, error) = drain(scripted(events, PipelineConfig::default()));
    assert!(error.is_none());
    assert_eq!(buffers.len(), 1);
    assert_eq!(buffers[0].records().count(), 1);

    let node = first_object(&buffers[0]);
    assert_eq!(node.kind(), ItemType::Node);
    assert_eq!(node.location(), Location::from_degrees(1.5, -2.25));
    let tags: Vec<Tag<'_>> = node.tags().iter().collect();
    assert_eq!(
        tags,
        vec![
            Tag { key: "amenity", value: "cafe" },
            Tag { key: "name", value: "Blue" },
        ]
    );
}

#[test]
fn way_keeps_reference_order() {
    let events = with_header(vec![way_events(5, &[10, 20, 30])]);
    let (buffers, _) = drain(scripted(events, PipelineConfig::default()));
    assert_eq!(buffers.len(), 1);

    let way = first_object(&buffers[0]);
    assert_eq!(way.kind(), ItemType::Way);
    assert_eq!(way.nodes().len(), 3);
    let refs: Vec<i64> = way.nodes().iter().map(|r| r.id).collect();
    assert_eq!(refs, vec![10, 20, 30]);
}

#[test]
fn relation_members_and_metadata() {
    let events = with_header(vec![relation_events(
        9,
        &[(ItemType::Way, 4, "outer"), (ItemType::Node, 2, "")],
    )]);
    let (buffers, _) = drain(scripted(events, PipelineConfig::default()));
    let relation = first_object(&buffers[0]);
    assert_eq!(relation.version(), 3);
    let members: Vec<Member<'_>> = relation.members().iter().collect();
    assert_eq!(
        members,
        vec![
            Member { kind: ItemType::Way, id: 4, role: "outer" },
            Member { kind: ItemType::Node, id: 2, role: "" },
        ]
    );
}

#[test]
fn metadata_can_be_left_out() {
    let events = with_header(vec![relation_events(9, &[])]);
    let config = PipelineConfig::default().with_read_metadata(false);
    let (buffers, _) = drain(scripted(events, config));
    let relation = first_object(&buffers[0]);
    assert_eq!(relation.id(), 9);
    assert_eq!(relation.version(), 0);
}

// ── Buffer boundaries ─────────────────────────────────────────────────────────

#[test]
fn flushes_exactly_where_the_kind_changes() {
    let events = with_header(vec![
        node_events(1, &[]),
        node_events(2, &[]),
        way_events(3, &[1, 2]),
        node_events(4, &[]),
    ]);
    let (buffers, error) = drain(scripted(events, PipelineConfig::default()));
    assert!(error.is_none());
    let keys: Vec<Vec<(ItemType, i64)>> = buffers.iter().map(entity_keys).collect();
    assert_eq!(
        keys,
        vec![
            vec![(ItemType::Node, 1), (ItemType::Node, 2)],
            vec![(ItemType::Way, 3)],
            vec![(ItemType::Node, 4)],
        ]
    );
}

#[test]
fn change_sections_split_buffers_when_asked() {
    let events = with_header(vec![
        vec![DecodeEvent::Section(ChangeSection::Create)],
        node_events(1, &[]),
        vec![DecodeEvent::Section(ChangeSection::Delete)],
        node_events(2, &[]),
    ]);
    let config = PipelineConfig::default().with_segregation(Segregation::ByTypeAndChange);
    let (buffers, _) = drain(scripted(events, config));
    assert_eq!(buffers.len(), 2);
    assert!(first_object(&buffers[0]).visible());
    assert!(!first_object(&buffers[1]).visible());
}

#[test]
fn fixed_buffers_never_split_an_entity() {
    let events = with_header((1..=5).map(|id| node_events(id, &[("amenity", "bench")])).collect());
    let config = PipelineConfig::default()
        .with_segregation(Segregation::None)
        .with_buffer_capacity(200)
        .with_growth(GrowthPolicy::Fixed)
        .with_flush_threshold(0);
    let (buffers, error) = drain(scripted(events, config));
    assert!(error.is_none(), "{error:?}");
    assert!(buffers.len() > 1);
    assert!(buffers.iter().all(|b| b.capacity() == 200));
    assert_eq!(ids(&buffers), vec![1, 2, 3, 4, 5]);
}

#[test]
fn spilled_buffers_keep_input_order() {
    let events = with_header((1..=12).map(|id| node_events(id, &[("k", "v")])).collect());
    let config = PipelineConfig::default()
        .with_segregation(Segregation::None)
        .with_buffer_capacity(128)
        .with_growth(GrowthPolicy::Spill)
        .with_flush_threshold(0);
    let (buffers, error) = drain(scripted(events, config));
    assert!(error.is_none(), "{error:?}");
    assert!(buffers.len() > 1);
    assert_eq!(ids(&buffers), (1..=12).collect::<Vec<_>>());
}

#[test]
fn entity_larger_than_an_empty_buffer_fails() {
    let tags: Vec<(String, String)> = (0..20).map(|i| (format!("key{i}"), "x".repeat(20))).collect();
    let tags: Vec<(&str, &str)> = tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let events = with_header(vec![node_events(1, &[]), node_events(2, &tags)]);
    let config = PipelineConfig::default()
        .with_buffer_capacity(128)
        .with_growth(GrowthPolicy::Fixed)
        .with_flush_threshold(0);
    let (buffers, error) = drain(scripted(events, config));
    assert_eq!(ids(&buffers), vec![1]);
    assert!(matches!(
        error,
        Some(PipelineError::Capacity { capacity: 128, kind: ItemType::Node, id: 2 })
    ));
}

#[test]
fn read_types_filter_entities() {
    let config = PipelineConfig::default().with_read_types(EntityBits::WAY | EntityBits::RELATION);
    let (buffers, _) = drain(scripted(small_extract(4), config));
    let keys: Vec<(ItemType, i64)> = buffers.iter().flat_map(entity_keys).collect();
    assert_eq!(keys, vec![(ItemType::Way, 100), (ItemType::Relation, 200)]);
}

#[test]
fn nothing_requested_means_header_only() {
    let config = PipelineConfig::default().with_read_types(EntityBits::NOTHING);
    let mut reader = scripted(small_extract(4), config);
    assert_eq!(reader.header().unwrap().generator(), Some("geoarena-tests"));
    assert!(reader.read().unwrap().is_none());
}

// ── Header and errors ─────────────────────────────────────────────────────────

#[test]
fn header_arrives_before_any_buffer() {
    let mut events = vec![
        DecodeEvent::HeaderAttribute {
            key: "xml_josm_upload".into(),
            value: "false".into(),
        },
        DecodeEvent::MultipleVersions(true),
    ];
    events.extend(small_extract(2));
    let mut reader = scripted(events, PipelineConfig::default());
    let header = reader.header().unwrap();
    assert_eq!(header.get("xml_josm_upload"), Some("false"));
    assert_eq!(header.generator(), Some("geoarena-tests"));
    assert!(header.has_multiple_object_versions());

    let (buffers, error) = drain(reader);
    assert!(error.is_none());
    assert_eq!(buffers.iter().map(|b| b.records().count()).sum::<usize>(), 4);
}

#[test]
fn decode_error_after_committed_entities() {
    let decoder = EventListDecoder::new(with_header(vec![node_events(1, &[]), node_events(2, &[])]))
        .then_fail(PipelineError::Format {
            message: "unexpected byte".into(),
            position: 42,
        });
    let mut reader = Reader::open(Box::new(decoder), PipelineConfig::default()).unwrap();
    assert!(reader.header().is_ok());
    let (buffers, error) = drain(reader);
    assert_eq!(ids(&buffers), vec![1, 2]);
    assert!(matches!(error, Some(PipelineError::Format { position: 42, .. })));
}

#[test]
fn decode_error_before_the_header_closes() {
    let decoder = EventListDecoder::new(vec![DecodeEvent::Generator("x".into())])
        .then_fail(PipelineError::Format {
            message: "truncated header".into(),
            position: 1,
        });
    let mut reader = Reader::open(Box::new(decoder), PipelineConfig::default()).unwrap();
    assert!(matches!(reader.header(), Err(PipelineError::Format { .. })));
    assert!(reader.read().is_err());
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn unterminated_entity_is_a_format_error() {
    let events = with_header(vec![vec![DecodeEvent::begin(ItemType::Node, [("id", "1")])]]);
    let (buffers, error) = drain(scripted(events, PipelineConfig::default()));
    assert!(buffers.is_empty());
    assert!(matches!(error, Some(PipelineError::Format { .. })));
}

#[test]
fn entity_without_id_ends_the_stream_once() {
    let events = with_header(vec![
        node_events(1, &[]),
        vec![
            DecodeEvent::begin(ItemType::Node, [("lon", "1"), ("lat", "2")]),
            DecodeEvent::EndEntity,
        ],
        node_events(3, &[]),
    ]);
    let mut reader = scripted(events, PipelineConfig::default());

    let first = reader.read().unwrap().expect("buffer before the error");
    assert_eq!(entity_keys(&first), vec![(ItemType::Node, 1)]);

    let err = reader.read().unwrap_err();
    assert!(matches!(err, PipelineError::Format { .. }));
    assert!(err.to_string().ends_with("node without an id"), "{err}");

    assert!(reader.read().unwrap().is_none());
    assert!(reader.read().unwrap().is_none());
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

struct Endless(i64);

impl Decoder for Endless {
    fn next_event(&mut self) -> Result<Option<DecodeEvent>, PipelineError> {
        self.0 += 1;
        Ok(Some(if self.0 % 2 == 1 {
            DecodeEvent::begin(ItemType::Way, [("id", self.0.to_string())])
        } else {
            DecodeEvent::EndEntity
        }))
    }
}

#[test]
fn slow_consumer_bounds_the_queue() {
    let config = PipelineConfig::default()
        .with_segregation(Segregation::None)
        .with_buffer_capacity(256)
        .with_flush_threshold(200)
        .with_max_queue_len(3);
    let mut reader = Reader::open(Box::new(Endless(0)), config).unwrap();
    for _ in 0..20 {
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(reader.queued() <= 3);
        assert!(reader.read().unwrap().is_some());
    }
    reader.close();
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn dropping_a_reader_stops_the_producer() {
    let config = PipelineConfig::default()
        .with_buffer_capacity(256)
        .with_flush_threshold(200)
        .with_max_queue_len(1);
    let mut reader = Reader::open(Box::new(Endless(0)), config).unwrap();
    assert!(reader.read().unwrap().is_some());
    drop(reader);
}

// ── Formats ───────────────────────────────────────────────────────────────────

#[test]
fn arena_files_through_the_global_registry() {
    let mut writer = FrameWriter::new(Vec::new(), Box::new(ZstdCodec::default())).unwrap();
    writer.write_buffer(&node_buffer(4, 1024, GrowthPolicy::AutoGrow)).unwrap();
    writer.write_buffer(&node_buffer(2, 1024, GrowthPolicy::AutoGrow)).unwrap();
    assert_eq!(writer.frames(), 2);
    let bytes = writer.finish().unwrap();

    let format = FileFormat::from_extension("extract.arena").unwrap();
    let reader = Reader::open_format(format, Box::new(Cursor::new(bytes)), PipelineConfig::default())
        .unwrap();
    let (buffers, error) = drain(reader);
    assert!(error.is_none());
    assert_eq!(ids(&buffers), vec![1, 2, 3, 4, 1, 2]);
}

#[test]
fn custom_decoders_can_be_registered() {
    let registry = FormatRegistry::new();
    assert!(!registry.register(FileFormat::Opl, |_input| {
        Ok(Box::new(EventListDecoder::new(small_extract(3))) as Box<dyn Decoder>)
    }));
    assert_eq!(registry.formats(), vec![FileFormat::Opl]);

    let reader = Reader::with_registry(
        &registry,
        FileFormat::Opl,
        Box::new(std::io::empty()),
        PipelineConfig::default(),
    )
    .unwrap();
    let (buffers, _) = drain(reader);
    assert_eq!(buffers.len(), 3);

    let err = Reader::with_registry(
        &registry,
        FileFormat::Xml,
        Box::new(std::io::empty()),
        PipelineConfig::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.to_string(), "unsupported format 'xml', available: [opl]");
}
