//! Byte-range view (C1): scoped, read-only acquisition of the archive's
//! bytes. Backed by a memory map for `open`, or a caller-provided buffer for
//! `from_buffer`. Stable for the lifetime of the archive; shareable
//! read-only across concurrently-opened archives over the same file.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::Result;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// A read-only view over archive bytes.
///
/// `Archive::open` acquires this by memory-mapping the file; `from_buffer`
/// lets a caller hand over an already-loaded buffer (e.g. bytes fetched
/// from a non-filesystem source) instead. Either way, `ArchiveReader` and
/// every `EntryStream` it produces hold only a borrow on this view — no
/// raw pointers, per the "pointer-into-mapped-file → arena+index" design
/// note (spec.md §9).
pub struct ByteView {
    backing: Backing,
}

impl ByteView {
    /// Memory-map `path` read-only. Fails with `Error::Io` when the path is
    /// not a regular, readable, mappable file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only and the file is not expected to
        // be mutated concurrently by another process for the archive's
        // lifetime; this is the same caveat every mmap-based reader in the
        // Rust ecosystem carries and is inherent to the format's design.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            backing: Backing::Mapped(mmap),
        })
    }

    /// Adopt an already-loaded buffer as the archive's byte view, instead of
    /// mapping a file.
    pub fn from_buffer(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Owned(bytes),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(m) => m,
            Backing::Owned(v) => v,
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
