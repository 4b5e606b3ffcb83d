#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: RecordHeader::read_from.
//
// Catches bugs in:
// - Truncated headers
// - byte_size below the header size
// - Reserved flag bits
fuzz_target!(|data: &[u8]| {
    if let Ok(header) = geoarena_wire::RecordHeader::read_from(data) {
        assert!(header.padded_size() >= geoarena_wire::RECORD_HEADER_SIZE);
        assert_eq!(header.padded_size() % geoarena_wire::ALIGN_BYTES, 0);
    }
});
