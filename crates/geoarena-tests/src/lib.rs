//! Shared fixtures for the integration tests and benchmarks.
//!
//! Event scripts stand in for a real input decoder: each helper returns
//! the [`DecodeEvent`]s a decoder would emit for one entity, so tests
//! can describe an input file as a flat list.

use geoarena_buffer::{Buffer, BuilderStack, GrowthPolicy};
use geoarena_pipeline::{DecodeEvent, PipelineConfig, PipelineError, Reader};
use geoarena_types::{Entity, ItemType, Location, NodeRef, ObjectFields};

// ── Event scripts ────────────────────────────────────────────────────────────

/// A node with the given tags.
pub fn node_events(id: i64, tags: &[(&str, &str)]) -> Vec<DecodeEvent> {
    let mut events = vec![DecodeEvent::begin(
        ItemType::Node,
        [("id", id.to_string()), ("lon", "1.5".into()), ("lat", "-2.25".into())],
    )];
    events.extend(tags.iter().map(|(k, v)| DecodeEvent::tag(*k, *v)));
    events.push(DecodeEvent::EndEntity);
    events
}

/// A way referencing `refs` in order.
pub fn way_events(id: i64, refs: &[i64]) -> Vec<DecodeEvent> {
    let mut events = vec![DecodeEvent::begin(ItemType::Way, [("id", id.to_string())])];
    events.extend(refs.iter().map(|&r| DecodeEvent::node_ref(r)));
    events.push(DecodeEvent::EndEntity);
    events
}

/// A relation with one member per `(kind, id, role)`.
pub fn relation_events(id: i64, members: &[(ItemType, i64, &str)]) -> Vec<DecodeEvent> {
    let mut events = vec![DecodeEvent::begin(
        ItemType::Relation,
        [("id", id.to_string()), ("version", "3".into())],
    )];
    events.extend(
        members
            .iter()
            .map(|&(kind, member, role)| DecodeEvent::member(kind, member, role)),
    );
    events.push(DecodeEvent::EndEntity);
    events
}

/// A header followed by `count` tagged nodes, then a way and a relation
/// over them.
pub fn small_extract(count: i64) -> Vec<DecodeEvent> {
    let mut events = vec![
        DecodeEvent::Generator("geoarena-tests".into()),
        DecodeEvent::EndOfHeader,
    ];
    for id in 1..=count {
        events.extend(node_events(id, &[("amenity", "bench"), ("ref", "n")]));
    }
    let refs: Vec<i64> = (1..=count).collect();
    events.extend(way_events(100, &refs));
    events.extend(relation_events(
        200,
        &[(ItemType::Way, 100, "outer"), (ItemType::Node, 1, "label")],
    ));
    events
}

// ── Consuming a pipeline ─────────────────────────────────────────────────────

/// Read every buffer; the error, if any, ends the list.
pub fn drain(mut reader: Reader) -> (Vec<Buffer>, Option<PipelineError>) {
    let mut buffers = Vec::new();
    loop {
        match reader.read() {
            Ok(Some(buffer)) => buffers.push(buffer),
            Ok(None) => return (buffers, None),
            Err(err) => return (buffers, Some(err)),
        }
    }
}

/// Open a reader over a scripted event list.
///
/// # Panics
///
/// If the producer thread cannot be started.
pub fn scripted(events: Vec<DecodeEvent>, config: PipelineConfig) -> Reader {
    let decoder = geoarena_pipeline::EventListDecoder::new(events);
    Reader::open(Box::new(decoder), config).expect("failed to start the pipeline")
}

/// `(kind, id)` of every entity in a buffer.
///
/// # Panics
///
/// If a record does not decode.
pub fn entity_keys(buffer: &Buffer) -> Vec<(ItemType, i64)> {
    buffer
        .entities()
        .map(|entity| {
            let entity = entity.expect("undecodable entity");
            (entity.item_type(), entity.id().unwrap_or(-1))
        })
        .collect()
}

/// The node, way or relation view of the first entity in `buffer`.
///
/// # Panics
///
/// If the buffer is empty or starts with something else.
pub fn first_object(buffer: &Buffer) -> geoarena_types::ObjectView<'_> {
    match buffer.entities().next() {
        Some(Ok(Entity::Node(view) | Entity::Way(view) | Entity::Relation(view))) => view,
        other => panic!("expected an object, found {other:?}"),
    }
}

// ── Direct building ──────────────────────────────────────────────────────────

/// A buffer of `count` nodes with two tags each.
///
/// # Panics
///
/// If a `Fixed` buffer is too small for `count` nodes.
pub fn node_buffer(count: i64, capacity: usize, growth: GrowthPolicy) -> Buffer {
    let mut buffer = Buffer::new(capacity, growth);
    let mut stack = BuilderStack::new();
    for id in 1..=count {
        let location = Location::new_raw(i32::try_from(id).unwrap_or(0), 7);
        stack
            .open_node(&mut buffer, &ObjectFields::new(id), location, "mapper")
            .expect("open node");
        stack.add_tag(&mut buffer, "highway", "crossing").expect("tag");
        stack.add_tag(&mut buffer, "crossing", "zebra").expect("tag");
        stack.finish(&mut buffer).expect("finish node");
    }
    buffer
}

/// A way over `refs`, each with an undefined location.
///
/// # Panics
///
/// Never for an auto-growing buffer.
pub fn way_buffer(id: i64, refs: &[i64]) -> Buffer {
    let mut buffer = Buffer::new(256, GrowthPolicy::AutoGrow);
    let mut stack = BuilderStack::new();
    stack
        .open_way(&mut buffer, &ObjectFields::new(id), "")
        .expect("open way");
    for &r in refs {
        stack
            .add_node_ref(&mut buffer, NodeRef::new(r, Location::undefined()))
            .expect("node ref");
    }
    stack.finish(&mut buffer).expect("finish way");
    buffer
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// Hex dump with one aligned 8-byte row per line, prefixed by its offset.
pub fn hex_rows(bytes: &[u8]) -> String {
    bytes
        .chunks(8)
        .enumerate()
        .map(|(i, row)| format!("{:04x}  {}", i * 8, hex::encode(row)))
        .collect::<Vec<_>>()
        .join("\n")
}
