/// Alignment unit for every record in an arena.
///
/// Records start at multiples of this value and are padded with zero
/// bytes up to the next multiple, so a reader can always step from one
/// record to the next with `offset + padded_length(byte_size)`.
pub const ALIGN_BYTES: usize = 8;

/// Round `len` up to the next multiple of [`ALIGN_BYTES`].
///
/// | len | padded |
/// |-----|--------|
/// | 0   | 0      |
/// | 1   | 8      |
/// | 8   | 8      |
/// | 9   | 16     |
/// | 27  | 32     |
#[must_use]
pub const fn padded_length(len: usize) -> usize {
    (len + ALIGN_BYTES - 1) & !(ALIGN_BYTES - 1)
}

/// Number of zero bytes needed after `len` bytes to reach alignment.
#[must_use]
pub const fn padding_for(len: usize) -> usize {
    padded_length(len) - len
}

#[must_use]
pub const fn is_aligned(offset: usize) -> bool {
    offset % ALIGN_BYTES == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_length_table() {
        let cases = [(0, 0), (1, 8), (7, 8), (8, 8), (9, 16), (27, 32), (40, 40)];
        for (len, padded) in cases {
            assert_eq!(padded_length(len), padded, "padded_length({len})");
        }
    }

    #[test]
    fn padding_is_always_below_alignment() {
        for len in 0..64 {
            let pad = padding_for(len);
            assert!(pad < ALIGN_BYTES);
            assert!(is_aligned(len + pad));
        }
    }

    #[test]
    fn alignment_check() {
        assert!(is_aligned(0));
        assert!(is_aligned(16));
        assert!(!is_aligned(4));
        assert!(!is_aligned(17));
    }
}
