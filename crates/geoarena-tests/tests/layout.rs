//! Byte layout tests: records built through the public builder API,
//! dumped as hex and compared against insta snapshots.
//!
//! Every row of a dump is one 8-byte alignment unit, so padding shows up
//! as trailing zeros at the end of a row. A changed snapshot means the
//! stored format changed; buffers written by older builds would no
//! longer read back.
//!
//! ```bash
//! INSTA_UPDATE=always cargo test -p geoarena-tests --test layout
//! ```

use geoarena_buffer::{Buffer, BuilderStack, GrowthPolicy};
use geoarena_codec::{NoCodec, decode_buffer, encode_buffer};
use geoarena_tests::{hex_rows, way_buffer};
use geoarena_types::{ItemType, Location, ObjectFields, Timestamp};
use geoarena_wire::{ALIGN_BYTES, DiffIndicator};
use insta::assert_snapshot;

fn tagged_node() -> Buffer {
    let mut buffer = Buffer::new(128, GrowthPolicy::Fixed);
    let mut stack = BuilderStack::new();
    let fields = ObjectFields {
        id: 1,
        version: 2,
        changeset: 3,
        timestamp: Timestamp::from_seconds(4),
        uid: 5,
        visible: true,
    };
    stack
        .open_node(&mut buffer, &fields, Location::new_raw(10, 20), "ab")
        .unwrap();
    stack.add_tag(&mut buffer, "k", "v").unwrap();
    stack.finish(&mut buffer).unwrap();
    buffer
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

#[test]
fn node_record() {
    let buffer = tagged_node();
    assert_eq!(buffer.committed(), 72);
    assert_snapshot!("node_record", hex_rows(buffer.committed_bytes()));
}

#[test]
fn way_record() {
    let mut buffer = way_buffer(2, &[7, 8]);
    buffer.set_removed(0, true).unwrap();
    buffer.set_diff(0, DiffIndicator::Right).unwrap();
    assert_snapshot!("way_record", hex_rows(buffer.committed_bytes()));
}

// ── Structural checks ─────────────────────────────────────────────────────────

#[test]
fn every_record_starts_aligned() {
    let mut buffer = Buffer::new(64, GrowthPolicy::AutoGrow);
    let mut stack = BuilderStack::new();
    for (id, user) in [(1, ""), (2, "a"), (3, "seven77"), (4, "eight888")] {
        stack
            .open_node(&mut buffer, &ObjectFields::new(id), Location::undefined(), user)
            .unwrap();
        stack.add_tag(&mut buffer, "name", &"x".repeat(id as usize * 3)).unwrap();
        stack.finish(&mut buffer).unwrap();
    }
    let offsets: Vec<usize> = buffer.records().map(|r| r.offset()).collect();
    assert_eq!(offsets.len(), 4);
    assert!(offsets.iter().all(|o| o % ALIGN_BYTES == 0));
    assert_eq!(buffer.committed() % ALIGN_BYTES, 0);
}

#[test]
fn views_read_back_what_was_built() {
    let buffer = tagged_node();
    let node = geoarena_tests::first_object(&buffer);
    assert_eq!(node.kind(), ItemType::Node);
    assert_eq!(node.id(), 1);
    assert_eq!(node.version(), 2);
    assert_eq!(node.changeset(), 3);
    assert_eq!(node.timestamp(), Timestamp::from_seconds(4));
    assert_eq!(node.uid(), 5);
    assert_eq!(node.user(), "ab");
    assert_eq!(node.location(), Location::new_raw(10, 20));
    assert_eq!(node.tags().get("k"), Some("v"));
    assert!(node.nodes().is_empty());
}

#[test]
fn uncompressed_frame_wraps_the_committed_bytes() {
    let buffer = tagged_node();
    let frame = encode_buffer(&buffer, &NoCodec).unwrap();
    assert_eq!(&frame[..2], &[0x48, 0x00]);
    assert_eq!(&frame[2..], buffer.committed_bytes());

    let back = decode_buffer(&frame, GrowthPolicy::Fixed).unwrap();
    assert_eq!(back.committed_bytes(), buffer.committed_bytes());
}
