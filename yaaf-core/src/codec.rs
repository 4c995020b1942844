//! Codec adapter (C2): pluggable block compressor/decompressor. Variants are
//! selected by the compression bits in a manifest entry's `flags` field; the
//! default and only required variant is LZ4.

use crate::error::Result;

/// Core compression abstraction.
///
/// Each `Codec` implementation must compress/decompress individual blocks
/// independently — no cross-block state is permitted, which is the
/// invariant that makes random access possible (spec §4.2, §9 "LZ4 legacy
/// stream vs per-block LZ4"). Implementations live in the `yaaf-codecs`
/// crate; this trait only defines the seam.
pub trait Codec: Send + Sync {
    /// Flag bit stored in a manifest entry's `flags` field (e.g.
    /// [`crate::format::FLAG_LZ4`]).
    fn flag(&self) -> u16;

    /// Human-readable codec name for CLI display.
    fn name(&self) -> &'static str;

    /// Compress one independent block of raw bytes.
    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decompress one independent block.
    fn decompress_block(&self, compressed: &[u8]) -> Result<Vec<u8>>;
}
