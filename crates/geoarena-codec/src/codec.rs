use std::io::{Cursor, Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tracing::trace;

use crate::error::CodecError;

/// Default zstd compression level. Level 3 keeps encoding fast enough
/// to run on the producer thread.
const ZSTD_LEVEL: i32 = 3;

/// Upper bound on the output space reserved before any input is inflated.
const INITIAL_OUTPUT_CAPACITY: usize = 1 << 20;

/// Identifies a codec inside a transport frame.
///
/// ```text
/// ┌────┬───────┬──────────────────────┐
/// │ Id │ Kind  │ Crate                │
/// ├────┼───────┼──────────────────────┤
/// │ 0  │ None  │ (bytes stored as is) │
/// │ 1  │ Zstd  │ zstd                 │
/// │ 2  │ Zlib  │ flate2               │
/// └────┴───────┴──────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecKind {
    None,
    Zstd,
    Zlib,
}

impl CodecKind {
    #[must_use]
    pub fn wire_id(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd => 1,
            Self::Zlib => 2,
        }
    }

    /// # Errors
    ///
    /// [`CodecError::UnknownCodec`] for ids outside the table.
    pub fn from_wire_id(id: u8) -> Result<Self, CodecError> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::Zstd),
            2 => Ok(Self::Zlib),
            other => Err(CodecError::UnknownCodec { id: other }),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zstd => "zstd",
            Self::Zlib => "zlib",
        }
    }
}

/// A block compressor.
///
/// `decompress` is told the exact size the output must have and fails
/// when the stream inflates to anything else, which also bounds the
/// memory a corrupt stream can claim.
pub trait Codec: Send + Sync {
    fn kind(&self) -> CodecKind;

    /// # Errors
    ///
    /// [`CodecError::Compress`] if the underlying compressor fails.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    ///
    /// [`CodecError::Decompress`] for a corrupt stream,
    /// [`CodecError::SizeMismatch`] if the output is not `expected_size`
    /// bytes long.
    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>, CodecError>;
}

/// The codec for `kind`.
#[must_use]
pub fn codec_for(kind: CodecKind) -> Box<dyn Codec> {
    match kind {
        CodecKind::None => Box::new(NoCodec),
        CodecKind::Zstd => Box::new(ZstdCodec::default()),
        CodecKind::Zlib => Box::new(ZlibCodec::default()),
    }
}

/// Reads at most `expected + 1` bytes so an oversized stream is caught
/// without inflating all of it.
fn read_bounded(
    reader: impl Read,
    expected: usize,
    codec: &'static str,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(expected.min(INITIAL_OUTPUT_CAPACITY));
    let limit = u64::try_from(expected).unwrap_or(u64::MAX).saturating_add(1);
    reader
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompress {
            codec,
            reason: e.to_string(),
        })?;
    if out.len() != expected {
        return Err(CodecError::SizeMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoCodec;

impl Codec for NoCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::None
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>, CodecError> {
        if data.len() != expected_size {
            return Err(CodecError::SizeMismatch {
                expected: expected_size,
                actual: data.len(),
            });
        }
        Ok(data.to_vec())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    #[must_use]
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::with_level(ZSTD_LEVEL)
    }
}

impl Codec for ZstdCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Zstd
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let out = zstd::encode_all(Cursor::new(data), self.level).map_err(|e| {
            CodecError::Compress {
                codec: "zstd",
                reason: e.to_string(),
            }
        })?;
        trace!(raw = data.len(), compressed = out.len(), "zstd compressed");
        Ok(out)
    }

    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>, CodecError> {
        let decoder = zstd::stream::read::Decoder::new(data).map_err(|e| CodecError::Decompress {
            codec: "zstd",
            reason: e.to_string(),
        })?;
        read_bounded(decoder, expected_size, "zstd")
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ZlibCodec {
    level: u32,
}

impl ZlibCodec {
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self::with_level(Compression::default().level())
    }
}

impl Codec for ZlibCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Zlib
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let to_error = |e: std::io::Error| CodecError::Compress {
            codec: "zlib",
            reason: e.to_string(),
        };
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data).map_err(to_error)?;
        let out = encoder.finish().map_err(to_error)?;
        trace!(raw = data.len(), compressed = out.len(), "zlib compressed");
        Ok(out)
    }

    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>, CodecError> {
        read_bounded(ZlibDecoder::new(data), expected_size, "zlib")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        b"highway=residential;name=Main Street;".repeat(40)
    }

    #[test]
    fn wire_ids_roundtrip() {
        for kind in [CodecKind::None, CodecKind::Zstd, CodecKind::Zlib] {
            assert_eq!(CodecKind::from_wire_id(kind.wire_id()).unwrap(), kind);
            assert_eq!(codec_for(kind).kind(), kind);
        }
        assert_eq!(
            CodecKind::from_wire_id(9),
            Err(CodecError::UnknownCodec { id: 9 })
        );
    }

    #[test]
    fn zstd_roundtrip_shrinks() {
        let data = sample();
        let codec = ZstdCodec::default();
        let packed = codec.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(codec.decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn zlib_roundtrip_shrinks() {
        let data = sample();
        let codec = ZlibCodec::default();
        let packed = codec.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(codec.decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn wrong_expected_size_is_rejected() {
        let data = sample();
        for codec in [codec_for(CodecKind::Zstd), codec_for(CodecKind::Zlib)] {
            let packed = codec.compress(&data).unwrap();
            assert_eq!(
                codec.decompress(&packed, data.len() - 1),
                Err(CodecError::SizeMismatch {
                    expected: data.len() - 1,
                    actual: data.len()
                })
            );
            assert!(matches!(
                codec.decompress(&packed, data.len() + 5),
                Err(CodecError::SizeMismatch { .. })
            ));
        }
        assert!(matches!(
            NoCodec.decompress(&data, 3),
            Err(CodecError::SizeMismatch { expected: 3, .. })
        ));
    }

    #[test]
    fn declared_size_beyond_the_stream() {
        let data = sample();
        for codec in [codec_for(CodecKind::Zstd), codec_for(CodecKind::Zlib)] {
            let packed = codec.compress(&data).unwrap();
            assert_eq!(
                codec.decompress(&packed, crate::MAX_FRAME_RAW_SIZE),
                Err(CodecError::SizeMismatch {
                    expected: crate::MAX_FRAME_RAW_SIZE,
                    actual: data.len()
                })
            );
        }
    }

    #[test]
    fn garbage_fails_to_decompress() {
        let garbage = b"definitely not a compressed stream";
        assert!(matches!(
            ZstdCodec::default().decompress(garbage, 100),
            Err(CodecError::Decompress { codec: "zstd", .. })
        ));
        assert!(matches!(
            ZlibCodec::default().decompress(garbage, 100),
            Err(CodecError::Decompress { codec: "zlib", .. })
        ));
    }
}
