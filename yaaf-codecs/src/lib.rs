//! Concrete [`yaaf_core::Codec`] implementations: the default, required LZ4
//! block codec, plus a small resolver that maps a manifest entry's flag
//! bits back to the matching codec instance. The format defines only one
//! entry-level codec bit (spec.md §6.2); the uncompressed-passthrough path
//! is a per-block decision (the block header's own compressed bit), not a
//! second codec, so there is nothing else for this resolver to select.

mod lz4;

pub use lz4::Lz4Codec;

use yaaf_core::{Codec, Error, Result, FLAG_LZ4};

/// Resolve a codec implementation from a manifest entry's `flags` field.
pub fn codec_by_flags(flags: u16) -> Result<Box<dyn Codec>> {
    if flags & FLAG_LZ4 != 0 {
        Ok(Box::new(Lz4Codec))
    } else {
        Err(Error::FormatUnsupportedCodec { flags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_lz4_bit() {
        let codec = codec_by_flags(FLAG_LZ4).unwrap();
        assert_eq!(codec.name(), "lz4");
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(codec_by_flags(0).is_err());
    }
}
