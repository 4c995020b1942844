//! YAAF: a read-optimized, block-compressed archive format for many
//! small-to-medium files, built around memory-mapping and independently
//! decodable blocks so that any single entry can be opened, sought, and
//! decoded without touching its neighbors.
//!
//! This crate owns the binary layout, the read path (`ArchiveReader`,
//! `EntryStream`), and the write path (`ArchiveWriter`). Block compression
//! and content hashing are pluggable through the [`Codec`] and [`Hasher32`]
//! traits; concrete implementations live in `yaaf-codecs`.

mod archive;
mod byteview;
mod codec;
mod error;
mod format;
mod hash;
mod stream;
mod writer;

pub use archive::{ArchiveReader, FileInfo};
pub use byteview::ByteView;
pub use codec::Codec;
pub use error::{Error, Result};
pub use format::{
    PackedDateTime, ARCHIVE_SEP, BLOCK_SIZE, FLAG_LZ4, IMPLEMENTATION_VERSION, MAX_ARCHIVE_SIZE,
    MAX_FILE_SIZE, OLDEST_SUPPORTED_VERSION, SUPPORTED_COMPRESSIONS,
};
pub use hash::{hash_once, name_hash, Hasher32, Xxh32Hasher};
pub use stream::{EntryStream, SeekFrom};
pub use writer::{ArchiveWriter, EntryInput};
