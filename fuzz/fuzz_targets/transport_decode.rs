#![no_main]

use geoarena_buffer::GrowthPolicy;
use libfuzzer_sys::fuzz_target;

// Fuzz target: decode_buffer on untrusted frames.
//
// Catches bugs in:
// - Declared raw sizes above the frame limit
// - Unknown codec ids
// - Corrupt zstd / zlib streams
// - Inflated bytes that are not records
fuzz_target!(|data: &[u8]| {
    if let Ok(buffer) = geoarena_codec::decode_buffer(data, GrowthPolicy::Fixed) {
        assert_eq!(buffer.committed() % geoarena_wire::ALIGN_BYTES, 0);
    }
});
