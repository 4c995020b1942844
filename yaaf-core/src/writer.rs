//! Archive writer: streams entries (sorted by case-insensitive name)
//! into a `Write` sink as body-then-manifest-then-trailer, computing the
//! same hashes the reader verifies.

use std::io::{self, Read, Write};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::format::{
    BlockHeader, ManifestEntry, ManifestTrailer, PackedDateTime, BLOCK_SIZE, FILE_HEADER_MAGIC,
    IMPLEMENTATION_VERSION, MAX_ARCHIVE_SIZE, MAX_FILE_SIZE,
};
use crate::hash::{hash_once, name_hash, Hasher32, Xxh32Hasher};

/// One entry to be written: an archive-relative name, its last-modification
/// time, optional extra metadata bytes, and a byte source of exactly `size`
/// bytes.
pub struct EntryInput<'a> {
    pub name: String,
    pub last_mod: PackedDateTime,
    pub extra: Vec<u8>,
    pub size: u64,
    pub source: Box<dyn Read + 'a>,
}

impl<'a> EntryInput<'a> {
    pub fn new(name: impl Into<String>, last_mod: PackedDateTime, size: u64, source: impl Read + 'a) -> Self {
        Self {
            name: name.into(),
            last_mod,
            extra: Vec::new(),
            size,
            source: Box::new(source),
        }
    }

    pub fn with_extra(mut self, extra: Vec<u8>) -> Self {
        self.extra = extra;
        self
    }
}

/// Streaming archive writer.
pub struct ArchiveWriter<W: Write> {
    sink: W,
    codec: Box<dyn Codec>,
    block_size: u32,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(sink: W, codec: Box<dyn Codec>) -> Self {
        Self {
            sink,
            codec,
            block_size: BLOCK_SIZE,
        }
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Write every entry and the trailing manifest. Entries are sorted by
    /// case-insensitive name before anything is written, so body order and
    /// manifest order match (an interpretive choice for an otherwise
    /// underspecified ordering, recorded in the grounding ledger).
    ///
    /// Fails with [`Error::WriterNoEntries`] when `entries` is empty.
    /// Entries whose `size` is zero are silently dropped.
    pub fn write_all(mut self, entries: Vec<EntryInput<'_>>) -> Result<u64> {
        if entries.is_empty() {
            return Err(Error::WriterNoEntries);
        }

        let mut entries: Vec<EntryInput> = entries.into_iter().filter(|e| e.size > 0).collect();

        for e in &entries {
            if e.name.len() + 1 > u16::MAX as usize {
                return Err(Error::WriterNameTooLong(e.name.clone()));
            }
            if e.size > MAX_FILE_SIZE {
                return Err(Error::WriterSizeExceeded);
            }
        }

        entries.sort_by(|a, b| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()));

        let mut current_offset: u64 = 0;
        let mut records: Vec<(ManifestEntry, String, Vec<u8>)> = Vec::with_capacity(entries.len());

        for mut e in entries {
            let body_offset = current_offset;
            self.sink.write_all(&FILE_HEADER_MAGIC.to_le_bytes())?;
            current_offset += 4;
            let mut body_size: u64 = 4;

            let mut remaining = e.size;
            let mut file_hasher = Xxh32Hasher::new(0);
            let mut buf = vec![0u8; self.block_size as usize];

            while remaining > 0 {
                let chunk_len = remaining.min(self.block_size as u64) as usize;
                read_exact_from(&mut *e.source, &mut buf[..chunk_len])?;
                file_hasher.update(&buf[..chunk_len]);

                let compressed = self.codec.compress_block(&buf[..chunk_len])?;
                let (store_compressed, payload): (bool, &[u8]) = if compressed.len() < chunk_len {
                    (true, &compressed[..])
                } else {
                    (false, &buf[..chunk_len])
                };
                let hash = hash_once(payload, 0);

                let header = BlockHeader {
                    compressed: store_compressed,
                    size: payload.len() as u32,
                    hash,
                };
                self.sink.write_all(&header.to_bytes())?;
                self.sink.write_all(payload)?;
                current_offset += 8 + payload.len() as u64;
                body_size += 8 + payload.len() as u64;

                remaining -= chunk_len as u64;
            }

            self.sink.write_all(&BlockHeader::END_MARKER)?;
            current_offset += 8;
            body_size += 8;

            if current_offset > MAX_ARCHIVE_SIZE {
                return Err(Error::WriterSizeExceeded);
            }

            let record = ManifestEntry {
                size_compressed: body_size as u32,
                size_uncompressed: e.size as u32,
                file_hash: file_hasher.digest(),
                name_hash: name_hash(&e.name),
                offset: body_offset as u32,
                last_mod: e.last_mod,
                extra_len: e.extra.len() as u16,
                name_len: (e.name.len() + 1) as u16,
                flags: self.codec.flag(),
            };
            records.push((record, e.name, std::mem::take(&mut e.extra)));
        }

        let mut table_bytes = Vec::new();
        for (record, name, extra) in &records {
            table_bytes.extend_from_slice(&record.to_bytes());
            table_bytes.extend_from_slice(extra);
            table_bytes.extend_from_slice(name.as_bytes());
            table_bytes.push(0);
        }
        self.sink.write_all(&table_bytes)?;
        current_offset += table_bytes.len() as u64;

        let trailer = ManifestTrailer {
            version_built: IMPLEMENTATION_VERSION,
            version_required: IMPLEMENTATION_VERSION,
            n_entries: records.len() as u32,
            manifest_entries_size: table_bytes.len() as u32,
            entries_hash: hash_once(&table_bytes, 0),
        };
        self.sink.write_all(&trailer.to_bytes())?;
        current_offset += trailer.to_bytes().len() as u64;

        if current_offset > MAX_ARCHIVE_SIZE {
            return Err(Error::WriterSizeExceeded);
        }

        self.sink.flush()?;
        Ok(records.len() as u64)
    }
}

fn read_exact_from(source: &mut dyn Read, buf: &mut [u8]) -> io::Result<()> {
    source.read_exact(buf)
}
