#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use geoarena_buffer::{Buffer, BuilderStack, GrowthPolicy};
use geoarena_types::{Entity, ItemType, Location, NodeRef, ObjectFields};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzEntity {
    Node {
        id: i64,
        x: i32,
        y: i32,
        user: String,
        tags: Vec<(String, String)>,
    },
    Way {
        id: i64,
        refs: Vec<i64>,
        tags: Vec<(String, String)>,
    },
    Relation {
        id: i64,
        members: Vec<(u8, i64, String)>,
    },
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    entities: Vec<FuzzEntity>,
    spill: bool,
}

fn member_kind(id: u8) -> ItemType {
    match id % 3 {
        0 => ItemType::Node,
        1 => ItemType::Way,
        _ => ItemType::Relation,
    }
}

fn build(stack: &mut BuilderStack, buffer: &mut Buffer, entity: &FuzzEntity) {
    match entity {
        FuzzEntity::Node { id, x, y, user, tags } => {
            let location = Location::new_raw(*x, *y);
            stack.open_node(buffer, &ObjectFields::new(*id), location, user).unwrap();
            for (k, v) in tags {
                stack.add_tag(buffer, k, v).unwrap();
            }
        }
        FuzzEntity::Way { id, refs, tags } => {
            stack.open_way(buffer, &ObjectFields::new(*id), "").unwrap();
            for (k, v) in tags {
                stack.add_tag(buffer, k, v).unwrap();
            }
            for r in refs {
                stack.add_node_ref(buffer, NodeRef::new(*r, Location::undefined())).unwrap();
            }
        }
        FuzzEntity::Relation { id, members } => {
            stack.open_relation(buffer, &ObjectFields::new(*id), "").unwrap();
            for (kind, member, role) in members {
                stack.add_member(buffer, member_kind(*kind), *member, role).unwrap();
            }
        }
    }
    stack.finish(buffer).unwrap();
}

// Fuzz target: everything the builder writes must read back.
fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(input) = FuzzInput::arbitrary(&mut u) else {
        return;
    };
    let growth = if input.spill { GrowthPolicy::Spill } else { GrowthPolicy::AutoGrow };
    let mut buffer = Buffer::new(256, growth);
    let mut stack = BuilderStack::new();
    let mut buffers = Vec::new();
    for entity in input.entities.iter().take(64) {
        build(&mut stack, &mut buffer, entity);
        while let Some(nested) = buffer.take_nested() {
            buffers.push(nested);
        }
    }
    buffers.push(buffer);

    let mut seen = 0;
    for buffer in &buffers {
        for entity in buffer.entities() {
            let entity = entity.expect("builder output must decode");
            assert!(matches!(
                entity,
                Entity::Node(_) | Entity::Way(_) | Entity::Relation(_)
            ));
            seen += 1;
        }
    }
    assert_eq!(seen, input.entities.len().min(64));
});
