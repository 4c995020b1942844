//! End-to-end tests exercising the on-disk format through the public
//! reader/writer API: round-trip, multi-block seeking, directory listing,
//! corruption detection, case-insensitive lookup, and seek edge cases,
//! using deterministic pseudo-random data and scratch files under the
//! system temp directory.

use tempfile::tempdir;

use yaaf_codecs::{codec_by_flags, Lz4Codec};
use yaaf_core::{ArchiveReader, ArchiveWriter, EntryInput, Error, PackedDateTime, SeekFrom, BLOCK_SIZE};

fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

fn dt(year: u16, month: u8, day: u8, hour: u8, min: u8, sec: u8) -> PackedDateTime {
    PackedDateTime::new(year, month, day, hour, min, sec).unwrap()
}

fn read_all(stream: &mut yaaf_core::EntryStream<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(Some(&mut buf), buf.len()).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

#[test]
fn single_tiny_entry_roundtrips() {
    let entries = vec![EntryInput::new("hello.txt", dt(2024, 1, 2, 3, 4, 5), 3, &b"hi\n"[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();

    let archive = ArchiveReader::from_buffer(buf).unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive.list_all(), vec!["hello.txt"]);

    let mut stream = archive.open_entry("hello.txt", Box::new(Lz4Codec)).unwrap();
    assert_eq!(read_all(&mut stream), b"hi\n");

    let info = archive.stat("hello.txt").unwrap();
    assert_eq!(info.size_uncompressed, 3);
}

#[test]
fn multi_block_roundtrip_and_seek() {
    let len = 3 * BLOCK_SIZE as usize + 7; // 393223
    let data = pseudo_random_bytes(len, 0xDEAD_BEEF);

    let entries = vec![EntryInput::new("big.bin", dt(2024, 6, 1, 12, 0, 0), len as u64, &data[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();

    let archive = ArchiveReader::from_buffer(buf).unwrap();
    let mut stream = archive.open_entry("big.bin", Box::new(Lz4Codec)).unwrap();
    assert_eq!(read_all(&mut stream), data, "full read must match the original bytes exactly");

    let mut stream = archive.open_entry("big.bin", Box::new(Lz4Codec)).unwrap();
    let target = BLOCK_SIZE as u64 + 100;
    stream.seek(SeekFrom::Set(target)).unwrap();
    assert_eq!(stream.tell(), target);

    let mut out = vec![0u8; 50];
    let n = stream.read(Some(&mut out), 50).unwrap();
    assert_eq!(n, 50);
    assert_eq!(&out, &data[target as usize..target as usize + 50]);
}

#[test]
fn list_dir_scopes_to_immediate_children() {
    let names = ["a.txt", "sub/b.txt", "sub/c.txt", "sub/deep/d.txt"];
    let entries: Vec<EntryInput> = names
        .iter()
        .map(|n| EntryInput::new(*n, dt(2024, 1, 1, 0, 0, 0), 1, &b"x"[..]))
        .collect();
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();
    let archive = ArchiveReader::from_buffer(buf).unwrap();

    let mut top = archive.list_dir(".");
    top.sort();
    assert_eq!(top, vec!["a.txt"]);

    let mut under_sub = archive.list_dir("sub");
    under_sub.sort();
    assert_eq!(under_sub, vec!["sub/b.txt", "sub/c.txt", "sub/deep/d.txt"]);

    let under_deep = archive.list_dir("sub/deep");
    assert_eq!(under_deep, vec!["sub/deep/d.txt"]);
}

#[test]
fn block_payload_corruption_fails_check() {
    let len = 3 * BLOCK_SIZE as usize + 7;
    let data = pseudo_random_bytes(len, 0xDEAD_BEEF);
    let entries = vec![EntryInput::new("big.bin", dt(2024, 6, 1, 12, 0, 0), len as u64, &data[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();

    // File header (4) + block header (8) = byte 12 is the first payload byte
    // of the first block, whether it was stored compressed or verbatim.
    buf[12] ^= 0x01;

    let archive = ArchiveReader::from_buffer(buf).unwrap();
    let err = archive.check(&Lz4Codec).unwrap_err();
    assert!(matches!(err, Error::IntegrityBlockHash { .. }), "got {err:?}");
}

#[test]
fn entry_table_corruption_fails_open() {
    let entries = vec![EntryInput::new("hello.txt", dt(2024, 1, 2, 3, 4, 5), 3, &b"hi\n"[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();

    // Flip a byte just before the 24-byte trailer, inside the hashed
    // manifest entry table.
    let idx = buf.len() - 25;
    buf[idx] ^= 0xFF;

    let err = ArchiveReader::from_buffer(buf).unwrap_err();
    assert!(matches!(err, Error::FormatCorruptIndex), "got {err:?}");
}

#[test]
fn case_insensitive_lookup() {
    let entries = vec![EntryInput::new("Readme.MD", dt(2024, 1, 1, 0, 0, 0), 5, &b"title"[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();
    let archive = ArchiveReader::from_buffer(buf).unwrap();

    assert!(archive.contains("readme.md"));
    assert!(archive.contains("README.MD"));
    let mut stream = archive.open_entry("README.md", Box::new(Lz4Codec)).unwrap();
    assert_eq!(read_all(&mut stream), b"title");
}

#[test]
fn seek_past_eof_clamps() {
    let entries = vec![EntryInput::new("hello.txt", dt(2024, 1, 2, 3, 4, 5), 3, &b"hi\n"[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();
    let archive = ArchiveReader::from_buffer(buf).unwrap();

    let mut stream = archive.open_entry("hello.txt", Box::new(Lz4Codec)).unwrap();
    stream.seek(SeekFrom::Set(9999)).unwrap();
    assert!(stream.eof());
    assert_eq!(stream.tell(), 3);
    let mut out = [0u8; 8];
    assert_eq!(stream.read(Some(&mut out), 8).unwrap(), 0);
}

#[test]
fn backward_seek_within_block_lands_exactly() {
    let data = pseudo_random_bytes(BLOCK_SIZE as usize, 7);
    let entries = vec![EntryInput::new("one.bin", dt(2024, 1, 1, 0, 0, 0), data.len() as u64, &data[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();
    let archive = ArchiveReader::from_buffer(buf).unwrap();

    let mut stream = archive.open_entry("one.bin", Box::new(Lz4Codec)).unwrap();
    stream.seek(SeekFrom::Set(500)).unwrap();
    assert_eq!(stream.tell(), 500);

    stream.seek(SeekFrom::Cur(-37)).unwrap();
    assert_eq!(stream.tell(), 463, "backward seek must land exactly on position minus delta");

    let mut out = [0u8; 10];
    stream.read(Some(&mut out), 10).unwrap();
    assert_eq!(&out, &data[463..473]);
}

// ── Cross-cutting invariants ─────────────────────────────────────────────

#[test]
fn writer_reader_roundtrip_name_index_matches_input_set() {
    let inputs = ["one.txt", "dir/two.bin", "dir/sub/three.dat"];
    let owned: Vec<(String, Vec<u8>)> = inputs
        .iter()
        .enumerate()
        .map(|(i, n)| (n.to_string(), format!("payload-{i}").into_bytes()))
        .collect();
    let entries: Vec<EntryInput> = owned
        .iter()
        .map(|(n, p)| EntryInput::new(n.clone(), dt(2024, 3, 4, 5, 6, 7), p.len() as u64, &p[..]))
        .collect();

    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();

    let archive = ArchiveReader::from_buffer(buf).unwrap();
    let mut got: Vec<&str> = archive.list_all();
    got.sort();
    let mut want: Vec<&str> = inputs.to_vec();
    want.sort();
    assert_eq!(got, want);

    for (name, payload) in &owned {
        assert!(archive.contains(name));
        let mut stream = archive.open_entry(name, Box::new(Lz4Codec)).unwrap();
        assert_eq!(read_all(&mut stream), *payload);
    }
}

#[test]
fn incompressible_entry_is_zero_copy_and_readable() {
    // Pseudo-random bytes don't shrink under LZ4, so every block in this
    // entry is stored verbatim (compressed bit clear) even though the
    // entry's own manifest flags still say FLAG_LZ4 — passthrough is a
    // per-block decision, not a separate entry-level codec.
    let data = pseudo_random_bytes(4096, 99);
    let entries = vec![EntryInput::new("raw.bin", dt(2024, 1, 1, 0, 0, 0), data.len() as u64, &data[..])];
    let mut buf = Vec::new();
    ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();

    let archive = ArchiveReader::from_buffer(buf).unwrap();
    let info = archive.stat("raw.bin").unwrap();
    let codec = codec_by_flags(info.flags).unwrap();
    assert_eq!(codec.name(), "lz4");

    let mut stream = archive.open_entry("raw.bin", codec).unwrap();
    assert_eq!(read_all(&mut stream), data);
}

#[test]
fn archive_opened_from_a_real_mmapped_file_roundtrips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.yaaf");

    let entries = vec![
        EntryInput::new("a.txt", dt(2024, 5, 6, 7, 8, 9), 5, &b"alpha"[..]),
        EntryInput::new("b.txt", dt(2024, 5, 6, 7, 8, 9), 4, &b"beta"[..]),
    ];
    let file = std::fs::File::create(&path).unwrap();
    ArchiveWriter::new(file, Box::new(Lz4Codec)).write_all(entries).unwrap();

    let archive = ArchiveReader::open(&path).unwrap();
    assert_eq!(archive.len(), 2);
    archive.check(&Lz4Codec).unwrap();

    let mut stream = archive.open_entry("a.txt", Box::new(Lz4Codec)).unwrap();
    assert_eq!(read_all(&mut stream), b"alpha");
}

#[test]
fn writer_rejects_empty_entry_set() {
    let mut buf = Vec::new();
    let err = ArchiveWriter::new(&mut buf, Box::new(Lz4Codec))
        .write_all(Vec::new())
        .unwrap_err();
    assert!(matches!(err, Error::WriterNoEntries));
}

#[test]
fn writer_silently_drops_zero_byte_entries() {
    let entries = vec![
        EntryInput::new("empty.txt", dt(2024, 1, 1, 0, 0, 0), 0, &b""[..]),
        EntryInput::new("real.txt", dt(2024, 1, 1, 0, 0, 0), 1, &b"x"[..]),
    ];
    let mut buf = Vec::new();
    let written = ArchiveWriter::new(&mut buf, Box::new(Lz4Codec)).write_all(entries).unwrap();
    assert_eq!(written, 1);

    let archive = ArchiveReader::from_buffer(buf).unwrap();
    assert_eq!(archive.list_all(), vec!["real.txt"]);
}
