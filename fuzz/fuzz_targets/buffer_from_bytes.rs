#![no_main]

use geoarena_buffer::{Buffer, GrowthPolicy};
use libfuzzer_sys::fuzz_target;

// Fuzz target: adopting untrusted bytes as a buffer, then walking and
// viewing every record.
//
// Catches bugs in:
// - Record sizes that overlap or run past the end
// - Child lists with bad lengths or invalid UTF-8
// - Member lists with unknown member types
// - Purging a buffer of arbitrary records
fuzz_target!(|data: &[u8]| {
    let Ok(mut buffer) = Buffer::from_committed_bytes(data.to_vec(), GrowthPolicy::Fixed) else {
        return;
    };
    for entity in buffer.entities().flatten() {
        if let Some(object) = entity.as_object() {
            let _ = object.tags().iter().count();
            let _ = object.nodes().iter().count();
            let _ = object.members().iter().count();
        }
    }
    let offsets: Vec<usize> = buffer.records().map(|r| r.offset()).collect();
    for offset in offsets.iter().step_by(2) {
        let _ = buffer.set_removed(*offset, true);
    }
    let _ = buffer.purge_removed();
});
