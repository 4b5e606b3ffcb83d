#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: decode_varint and read_length_prefixed.
//
// Catches bugs in:
// - VarintTooLong (>10 continuation bytes)
// - Zero-length input
// - Length prefixes running past the end of the input
fuzz_target!(|data: &[u8]| {
    let _ = geoarena_wire::varint::decode_varint(data);
    if let Ok((bytes, consumed)) = geoarena_wire::varint::read_length_prefixed(data) {
        assert!(consumed <= data.len());
        assert!(bytes.len() < consumed);
    }
});
