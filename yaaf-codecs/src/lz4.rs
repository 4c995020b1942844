//! LZ4 block codec (the default, required codec), built on `lz4_flex`'s
//! safe, dependency-light block API with an explicit length prefix so
//! that `decompress_block` doesn't need to guess an output size.

use yaaf_core::{Codec, Error, Result, FLAG_LZ4};

/// Compresses and decompresses independent LZ4 blocks.
///
/// Each call is self-contained: no dictionary or window carries over
/// between blocks, which is what lets the reader decode any block without
/// its neighbors (spec.md §4.2).
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn flag(&self) -> u16 {
        FLAG_LZ4
    }

    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::compress_prepend_size(raw))
    }

    fn decompress_block(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        lz4_flex::decompress_size_prepended(compressed)
            .map_err(|e| Error::CodecFailed(format!("lz4: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_arbitrary_bytes() {
        let codec = Lz4Codec;
        let data = b"abcabcabcabcabcabcabc the quick brown fox".repeat(64);
        let compressed = codec.compress_block(&data).unwrap();
        let decompressed = codec.decompress_block(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn rejects_truncated_input() {
        let codec = Lz4Codec;
        assert!(codec.decompress_block(&[1, 2, 3]).is_err());
    }
}
