//! Archive reader: parses the trailing manifest, builds the
//! case-insensitive name index, and hands out [`EntryStream`]s and
//! integrity checks. Opening an archive is a three-step read: validate the
//! trailer, hash-check the manifest entry table, then parse each entry
//! record into the in-memory name index.

use std::collections::HashMap;
use std::path::Path;

use crate::byteview::ByteView;
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::format::{
    ManifestEntry, ManifestTrailer, PackedDateTime, ARCHIVE_SEP, FILE_HEADER_MAGIC,
    FILE_HEADER_SIZE, IMPLEMENTATION_VERSION, MANIFEST_ENTRY_FIXED_SIZE, MANIFEST_TRAILER_SIZE,
    OLDEST_SUPPORTED_VERSION, SUPPORTED_COMPRESSIONS,
};
use crate::hash::{hash_once, name_hash, Hasher32, Xxh32Hasher};
use crate::stream::EntryStream;

/// Metadata about one archive entry, without its content (mirrors
/// `YAAF_FileInfo`).
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub last_modification: PackedDateTime,
    pub size_compressed: u64,
    pub size_uncompressed: u64,
    pub extra: Vec<u8>,
    /// Raw codec flag bits (spec.md §6.2), exposed so a caller can pick the
    /// matching [`crate::Codec`] before calling `open_entry`.
    pub flags: u16,
}

struct Entry {
    record: ManifestEntry,
    name: String,
    extra: Vec<u8>,
}

/// A parsed, randomly-accessible archive.
///
/// Holds the memory-mapped (or buffer-backed) view alive for as long as the
/// reader and any `EntryStream`s it produced are in use.
pub struct ArchiveReader {
    view: ByteView,
    trailer: ManifestTrailer,
    entries: Vec<Entry>,
    /// name_hash → indices into `entries`, resolving collisions by comparing
    /// the stored, case-folded name at lookup time (the original source's
    /// open-addressing hash map — `YAAF_HashMap.c` — conflates equal hashes
    /// with equal keys; this rewrite does not).
    name_index: HashMap<u32, Vec<usize>>,
}

impl ArchiveReader {
    /// Memory-map `path` and parse its manifest, per spec.md §4.4.1.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let view = ByteView::open(path)?;
        Self::from_view(view)
    }

    /// Parse an already-loaded archive buffer.
    pub fn from_buffer(bytes: Vec<u8>) -> Result<Self> {
        Self::from_view(ByteView::from_buffer(bytes))
    }

    fn from_view(view: ByteView) -> Result<Self> {
        let size = view.len();
        if size < MANIFEST_TRAILER_SIZE {
            return Err(Error::FormatTooShort);
        }
        let slice = view.as_slice();

        let trailer_start = (size - MANIFEST_TRAILER_SIZE) as usize;
        let trailer_bytes: [u8; MANIFEST_TRAILER_SIZE as usize] =
            slice[trailer_start..].try_into().unwrap();
        let trailer = ManifestTrailer::from_bytes(&trailer_bytes)?;

        if trailer.version_required > IMPLEMENTATION_VERSION
            || trailer.version_required < OLDEST_SUPPORTED_VERSION
        {
            return Err(Error::FormatUnsupportedVersion {
                required: trailer.version_required,
                current: IMPLEMENTATION_VERSION,
                oldest: OLDEST_SUPPORTED_VERSION,
            });
        }

        let manifest_size = trailer.manifest_entries_size as u64;
        let table_start = size
            .checked_sub(MANIFEST_TRAILER_SIZE)
            .and_then(|t| t.checked_sub(manifest_size))
            .ok_or(Error::FormatTruncated)?;

        let table_bytes = &slice[table_start as usize..trailer_start];
        if hash_once(table_bytes, 0) != trailer.entries_hash {
            return Err(Error::FormatCorruptIndex);
        }

        let mut entries = Vec::with_capacity(trailer.n_entries as usize);
        let mut name_index: HashMap<u32, Vec<usize>> =
            HashMap::with_capacity(trailer.n_entries as usize);

        let mut cursor = table_start;
        let table_end = trailer_start as u64;
        for _ in 0..trailer.n_entries {
            let fixed_end = cursor
                .checked_add(MANIFEST_ENTRY_FIXED_SIZE)
                .ok_or(Error::FormatTruncated)?;
            if fixed_end > table_end {
                return Err(Error::FormatTruncated);
            }
            let fixed_bytes: [u8; MANIFEST_ENTRY_FIXED_SIZE as usize] =
                slice[cursor as usize..fixed_end as usize].try_into().unwrap();
            let record = ManifestEntry::from_bytes(&fixed_bytes)?;
            if record.flags & SUPPORTED_COMPRESSIONS == 0 {
                return Err(Error::FormatUnsupportedCodec { flags: record.flags });
            }

            let extra_start = fixed_end;
            let extra_end = extra_start
                .checked_add(record.extra_len as u64)
                .ok_or(Error::FormatTruncated)?;
            let name_end = extra_end
                .checked_add(record.name_len as u64)
                .ok_or(Error::FormatTruncated)?;
            if name_end > table_end || record.name_len == 0 {
                return Err(Error::FormatTruncated);
            }

            let extra = slice[extra_start as usize..extra_end as usize].to_vec();
            // name_len includes the trailing NUL.
            let name_bytes = &slice[extra_end as usize..(name_end - 1) as usize];
            let name = String::from_utf8_lossy(name_bytes).into_owned();

            let idx = entries.len();
            name_index.entry(record.name_hash).or_default().push(idx);
            entries.push(Entry { record, name, extra });

            cursor = name_end;
        }

        Ok(Self {
            view,
            trailer,
            entries,
            name_index,
        })
    }

    fn find_entry(&self, name: &str) -> Option<&Entry> {
        let h = name_hash(name);
        self.name_index.get(&h)?.iter().find_map(|&i| {
            let e = &self.entries[i];
            if e.name.eq_ignore_ascii_case(name) {
                Some(e)
            } else {
                None
            }
        })
    }

    fn info_of(entry: &Entry) -> FileInfo {
        FileInfo {
            name: entry.name.clone(),
            last_modification: entry.record.last_mod,
            size_compressed: entry.record.size_compressed as u64,
            size_uncompressed: entry.record.size_uncompressed as u64,
            extra: entry.extra.clone(),
            flags: entry.record.flags,
        }
    }

    /// All entry names, in manifest (sorted-by-name) order.
    pub fn list_all(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Entries directly inside `prefix`. `prefix == "."` lists top-level
    /// entries (no `/` in their name); otherwise an entry matches when its
    /// name starts with `prefix` followed immediately by the path
    /// separator (spec.md §4.4.2).
    pub fn list_dir(&self, prefix: &str) -> Vec<&str> {
        if prefix == "." {
            return self
                .entries
                .iter()
                .filter(|e| !e.name.contains(ARCHIVE_SEP))
                .map(|e| e.name.as_str())
                .collect();
        }
        let stripped = prefix.strip_suffix(ARCHIVE_SEP).unwrap_or(prefix);
        self.entries
            .iter()
            .filter(|e| {
                e.name
                    .strip_prefix(stripped)
                    .and_then(|rest| rest.strip_prefix(ARCHIVE_SEP))
                    .is_some()
            })
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find_entry(name).is_some()
    }

    pub fn stat(&self, name: &str) -> Result<FileInfo> {
        self.find_entry(name)
            .map(Self::info_of)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn validate_file_header(&self, offset: u64) -> Result<()> {
        let slice = self.view.as_slice();
        let end = offset
            .checked_add(FILE_HEADER_SIZE)
            .ok_or(Error::FormatTruncated)? as usize;
        let bytes: [u8; 4] = slice
            .get(offset as usize..end)
            .ok_or(Error::FormatTruncated)?
            .try_into()
            .map_err(|_| Error::FormatTruncated)?;
        if u32::from_le_bytes(bytes) != FILE_HEADER_MAGIC {
            return Err(Error::FormatBadMagic);
        }
        Ok(())
    }

    /// Open `name` for streaming decode, using `codec` to decompress blocks
    /// whose compression bit matches `codec.flag()`.
    pub fn open_entry(&self, name: &str, codec: Box<dyn Codec>) -> Result<EntryStream<'_>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if entry.record.flags & codec.flag() == 0 {
            return Err(Error::FormatUnsupportedCodec {
                flags: entry.record.flags,
            });
        }
        self.validate_file_header(entry.record.offset as u64)?;
        EntryStream::new(
            &self.view,
            codec,
            entry.record.offset as u64,
            entry.record.size_compressed as u64,
            entry.record.size_uncompressed as u64,
        )
    }

    fn check_entry_record(&self, entry: &Entry, codec: &dyn Codec) -> Result<()> {
        if entry.record.flags & codec.flag() == 0 {
            return Err(Error::FormatUnsupportedCodec {
                flags: entry.record.flags,
            });
        }
        self.validate_file_header(entry.record.offset as u64)?;
        let slice = self.view.as_slice();
        let mut cursor = entry.record.offset as u64 + FILE_HEADER_SIZE;
        let mut file_hasher = Xxh32Hasher::new(0);
        let mut block_idx = 0u64;

        loop {
            let header_end = cursor
                .checked_add(8)
                .ok_or(Error::FormatTruncated)? as usize;
            let header_bytes: [u8; 8] = slice
                .get(cursor as usize..header_end)
                .ok_or(Error::FormatTruncated)?
                .try_into()
                .map_err(|_| Error::FormatTruncated)?;
            let header = crate::format::BlockHeader::from_bytes(&header_bytes);
            cursor = header_end as u64;

            if crate::format::BlockHeader::is_end_marker(header.size) {
                break;
            }

            let payload_end = cursor
                .checked_add(header.size as u64)
                .ok_or(Error::FormatTruncated)? as usize;
            let payload = slice
                .get(cursor as usize..payload_end)
                .ok_or(Error::FormatTruncated)?;

            if hash_once(payload, 0) != header.hash {
                return Err(Error::IntegrityBlockHash {
                    entry: entry.name.clone(),
                    block: block_idx,
                });
            }

            if header.compressed {
                let decoded = codec
                    .decompress_block(payload)
                    .map_err(|_| Error::CodecFailed("block decompression failed".into()))?;
                file_hasher.update(&decoded);
            } else {
                file_hasher.update(payload);
            }

            cursor = payload_end as u64;
            block_idx += 1;
        }

        if file_hasher.digest() != entry.record.file_hash {
            return Err(Error::IntegrityFileHash {
                entry: entry.name.clone(),
            });
        }
        Ok(())
    }

    /// Verify one entry's block hashes and overall content hash without
    /// materializing its decompressed bytes into caller-visible buffers
    /// (spec.md §4.4.5).
    pub fn check_entry(&self, name: &str, codec: &dyn Codec) -> Result<()> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.check_entry_record(entry, codec)
    }

    /// Verify every entry in the archive; stops at the first failure.
    pub fn check(&self, codec: &dyn Codec) -> Result<()> {
        for entry in &self.entries {
            self.check_entry_record(entry, codec)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn format_version(&self) -> u16 {
        self.trailer.version_built
    }
}
