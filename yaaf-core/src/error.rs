use thiserror::Error;

/// Every way a YAAF operation can fail.
///
/// Variants map 1:1 onto the archive format's error kinds: parser rejections
/// (`Format*`), codec failures, integrity-check mismatches, lookup misses,
/// seek misuse, and writer precondition violations. Rust's `Result` return
/// takes the place of the original C API's sentinel return value plus a
/// thread-local "last error" string.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive is too short to contain a manifest trailer")]
    FormatTooShort,

    #[error("bad magic bytes (not a YAAF archive, or a different section magic mismatch)")]
    FormatBadMagic,

    #[error("archive requires reader version {required}, this implementation supports {current} (oldest supported {oldest})")]
    FormatUnsupportedVersion {
        required: u16,
        current: u16,
        oldest: u16,
    },

    #[error("archive manifest is truncated")]
    FormatTruncated,

    #[error("manifest entry table hash does not match the trailer's recorded hash")]
    FormatCorruptIndex,

    #[error("manifest entry uses an unsupported codec (flags={flags:#06x})")]
    FormatUnsupportedCodec { flags: u16 },

    #[error("codec failed to decompress or compress a block: {0}")]
    CodecFailed(String),

    #[error("codec output buffer too small")]
    CodecOutputTooSmall,

    #[error("block payload hash mismatch in entry {entry:?} block {block}")]
    IntegrityBlockHash { entry: String, block: u64 },

    #[error("uncompressed content hash mismatch in entry {entry:?}")]
    IntegrityFileHash { entry: String },

    #[error("entry {0:?} not found in archive")]
    NotFound(String),

    #[error("negative absolute seek offset")]
    SeekInvalid,

    #[error("writer was given zero entries")]
    WriterNoEntries,

    #[error("writer exceeded the maximum archive or entry size")]
    WriterSizeExceeded,

    #[error("entry name {0:?} is longer than 65535 bytes")]
    WriterNameTooLong(String),

    #[error("last-modification date-time is out of the representable range")]
    WriterDateOutOfRange,
}

pub type Result<T> = std::result::Result<T, Error>;
