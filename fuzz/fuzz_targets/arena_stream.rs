#![no_main]

use geoarena_pipeline::{Decoder, FrameDecoder};
use libfuzzer_sys::fuzz_target;

// Fuzz target: FrameDecoder over an untrusted arena stream, running
// every blob task inline.
//
// Catches bugs in:
// - Bad magic or version
// - Frame lengths that are truncated or too large
fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new(data);
    for _ in 0..64 {
        match decoder.next_event() {
            Ok(Some(geoarena_pipeline::DecodeEvent::Blob(task))) => {
                let _ = task.run();
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }
});
