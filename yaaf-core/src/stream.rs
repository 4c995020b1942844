//! Entry stream (C5): per-open-entry decoder with a one-block cache,
//! forward/random seek, EOF, and tell. Pure memory operations once its
//! parent archive is mapped — no syscalls on the steady-state read path.

use crate::byteview::ByteView;
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::format::{BlockHeader, BLOCK_SIZE, FILE_HEADER_SIZE};

/// Where a `seek` offset is measured from, mirroring `fseek`'s `whence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Set(u64),
    Cur(i64),
    End,
}

enum Cache<'a> {
    Empty,
    /// A block stored verbatim (compressed bit clear): points directly into
    /// the mapped view, satisfying the zero-copy passthrough invariant.
    Borrowed(&'a [u8]),
    /// A block that was LZ4-decoded into a freshly allocated scratch buffer.
    Owned(Vec<u8>),
}

impl<'a> Cache<'a> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Cache::Empty => &[],
            Cache::Borrowed(s) => s,
            Cache::Owned(v) => v,
        }
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

/// Decoder for one open archive entry.
///
/// Created by `ArchiveReader::open_entry`; must not outlive the archive it
/// was opened from (enforced by the `'a` borrow on the underlying
/// [`ByteView`]).
pub struct EntryStream<'a> {
    view: &'a ByteView,
    codec: Box<dyn Codec>,
    /// Absolute offset of the first block header, i.e. just past the
    /// 4-byte file header.
    body_start: u64,
    /// Total bytes of the block sequence (headers + payloads + end marker),
    /// i.e. `entry.size_compressed - sizeof(file header)`.
    blocks_size: u64,
    uncompressed_size: u64,
    bytes_read_compressed: u64,
    bytes_decoded: u64,
    cache: Cache<'a>,
    cache_read_offset: usize,
}

impl<'a> EntryStream<'a> {
    pub(crate) fn new(
        view: &'a ByteView,
        codec: Box<dyn Codec>,
        entry_offset: u64,
        size_compressed: u64,
        size_uncompressed: u64,
    ) -> Result<Self> {
        let blocks_size = size_compressed
            .checked_sub(FILE_HEADER_SIZE)
            .ok_or(Error::FormatTruncated)?;
        Ok(Self {
            view,
            codec,
            body_start: entry_offset + FILE_HEADER_SIZE,
            blocks_size,
            uncompressed_size: size_uncompressed,
            bytes_read_compressed: 0,
            bytes_decoded: 0,
            cache: Cache::Empty,
            cache_read_offset: 0,
        })
    }

    fn header_at(&self, rel: u64) -> Result<BlockHeader> {
        let slice = self.view.as_slice();
        let start = (self.body_start + rel) as usize;
        let end = start
            .checked_add(8)
            .ok_or(Error::FormatTruncated)?;
        let bytes: [u8; 8] = slice
            .get(start..end)
            .ok_or(Error::FormatTruncated)?
            .try_into()
            .map_err(|_| Error::FormatTruncated)?;
        Ok(BlockHeader::from_bytes(&bytes))
    }

    /// Read a block header at the current position and refill the cache,
    /// decompressing through the codec when the compressed bit is set or
    /// pointing the cache directly into the mapped view otherwise (C2's
    /// zero-copy passthrough).
    fn decode_next_block(&mut self) -> Result<()> {
        let header = self.header_at(self.bytes_read_compressed)?;
        self.bytes_read_compressed += 8;

        if BlockHeader::is_end_marker(header.size) {
            self.cache = Cache::Empty;
            self.cache_read_offset = 0;
            return Ok(());
        }

        let slice = self.view.as_slice();
        let payload_start = (self.body_start + self.bytes_read_compressed) as usize;
        let payload_end = payload_start
            .checked_add(header.size as usize)
            .ok_or(Error::FormatTruncated)?;
        let payload = slice
            .get(payload_start..payload_end)
            .ok_or(Error::FormatTruncated)?;

        self.cache = if header.compressed {
            Cache::Owned(
                self.codec
                    .decompress_block(payload)
                    .map_err(|_| Error::CodecFailed("block decompression failed".into()))?,
            )
        } else {
            Cache::Borrowed(payload)
        };
        self.cache_read_offset = 0;
        self.bytes_read_compressed += header.size as u64;
        self.bytes_decoded += self.cache.len() as u64;
        Ok(())
    }

    /// Skip one whole block without decoding its payload: advances the
    /// compressed cursor past the header and payload, and the logical
    /// cursor by one nominal `BLOCK_SIZE` (every block decodes exactly
    /// `BLOCK_SIZE` bytes except the last — spec.md §4.5.3 Rationale).
    /// Returns `false` on hitting the end marker.
    fn skip_raw_block(&mut self) -> Result<bool> {
        let header = self.header_at(self.bytes_read_compressed)?;
        self.bytes_read_compressed += 8;
        if BlockHeader::is_end_marker(header.size) {
            return Ok(false);
        }
        self.bytes_read_compressed += header.size as u64;
        self.bytes_decoded += BLOCK_SIZE as u64;
        Ok(true)
    }

    /// Read up to `n` bytes. `buf = None` advances the logical position
    /// without copying anything out — used internally by `seek`. Returns
    /// the number of bytes actually produced (may be less than `n` at EOF).
    pub fn read(&mut self, mut buf: Option<&mut [u8]>, n: usize) -> Result<usize> {
        let mut written = 0usize;
        while written < n {
            if self.cache_read_offset >= self.cache.len() {
                self.decode_next_block()?;
                if self.cache.len() == 0 {
                    break; // EOF
                }
            }
            let avail = self.cache.len() - self.cache_read_offset;
            let take = (n - written).min(avail);
            if let Some(b) = buf.as_deref_mut() {
                b[written..written + take].copy_from_slice(
                    &self.cache.as_slice()[self.cache_read_offset..self.cache_read_offset + take],
                );
            }
            self.cache_read_offset += take;
            written += take;
        }
        Ok(written)
    }

    fn reset_to_start(&mut self) {
        self.bytes_read_compressed = 0;
        self.bytes_decoded = 0;
        self.cache = Cache::Empty;
        self.cache_read_offset = 0;
    }

    fn seek_set(&mut self, offset: u64) -> Result<()> {
        if offset >= self.uncompressed_size {
            // Clamp to EOF; subsequent reads return 0.
            self.bytes_read_compressed = self.blocks_size;
            self.bytes_decoded = self.uncompressed_size;
            self.cache = Cache::Empty;
            self.cache_read_offset = 0;
            return Ok(());
        }

        self.reset_to_start();
        let target_block = offset / BLOCK_SIZE as u64;
        for _ in 0..target_block {
            self.skip_raw_block()?;
        }
        self.decode_next_block()?;
        self.cache_read_offset = (offset % BLOCK_SIZE as u64) as usize;
        Ok(())
    }

    /// Seek within the entry's logical (uncompressed) byte stream.
    pub fn seek(&mut self, from: SeekFrom) -> Result<()> {
        match from {
            SeekFrom::Set(offset) => self.seek_set(offset),
            SeekFrom::End => {
                self.bytes_read_compressed = self.blocks_size;
                self.bytes_decoded = self.uncompressed_size;
                self.cache = Cache::Empty;
                self.cache_read_offset = 0;
                Ok(())
            }
            SeekFrom::Cur(delta) => {
                if delta < 0 {
                    let want_back = (-delta) as usize;
                    if want_back <= self.cache_read_offset {
                        self.cache_read_offset -= want_back;
                        Ok(())
                    } else {
                        let abs = self.tell() as i64 + delta;
                        if abs < 0 {
                            return Err(Error::SeekInvalid);
                        }
                        self.seek_set(abs as u64)
                    }
                } else {
                    self.read(None, delta as usize).map(|_| ())
                }
            }
        }
    }

    /// `true` once both the compressed and cache cursors are exhausted.
    pub fn eof(&self) -> bool {
        self.bytes_read_compressed >= self.blocks_size && self.cache_read_offset >= self.cache.len()
    }

    /// Absolute logical offset of the next byte `read` would produce.
    pub fn tell(&self) -> u64 {
        self.bytes_decoded - (self.cache.len() - self.cache_read_offset) as u64
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }
}
