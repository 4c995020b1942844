//! 32-bit hash adapter (C3): a streaming content hash used for manifest and
//! block integrity, and a separate case-insensitive name hash used to key
//! the archive's name index.

use xxhash_rust::xxh32::Xxh32;

/// Streaming 32-bit hash over content bytes, plus a one-shot convenience
/// function. The default and only implementation is xxHash32; a rewrite of
/// the original source's `YAAF_HashState_t` dispatch, which similarly wires
/// a single xxHash backend behind this interface (`YAAF_Hash.h`).
pub trait Hasher32 {
    fn reset(&mut self, seed: u32);
    fn update(&mut self, bytes: &[u8]);
    fn digest(&self) -> u32;
}

/// xxHash32-backed [`Hasher32`].
pub struct Xxh32Hasher(Xxh32);

impl Xxh32Hasher {
    pub fn new(seed: u32) -> Self {
        Self(Xxh32::new(seed))
    }
}

impl Default for Xxh32Hasher {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Hasher32 for Xxh32Hasher {
    fn reset(&mut self, seed: u32) {
        self.0 = Xxh32::new(seed);
    }

    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn digest(&self) -> u32 {
        self.0.digest()
    }
}

/// One-shot hash over `input`, matching `YAAF_Hash()`.
pub fn hash_once(input: &[u8], seed: u32) -> u32 {
    xxhash_rust::xxh32::xxh32(input, seed)
}

/// Case-insensitive one-at-a-time-style hash of an archive-relative name,
/// matching `YAAF_OnceAtATimeHashNoCase` (Bob Jenkins' one-at-a-time hash,
/// folding ASCII case before mixing each byte). Used to key the archive's
/// name index; lookups must hash with this same function.
pub fn name_hash(name: &str) -> u32 {
    let mut hash: u32 = 0;
    for &b in name.as_bytes() {
        let folded = b.to_ascii_lowercase();
        hash = hash.wrapping_add(folded as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_is_case_insensitive() {
        assert_eq!(name_hash("A/B"), name_hash("a/b"));
        assert_eq!(name_hash("Readme.MD"), name_hash("readme.md"));
        assert_ne!(name_hash("a/b"), name_hash("a/c"));
    }

    #[test]
    fn streaming_hash_matches_one_shot_over_whole_input() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let one_shot = hash_once(data, 0);
        let mut h = Xxh32Hasher::new(0);
        h.update(&data[..10]);
        h.update(&data[10..]);
        assert_eq!(h.digest(), one_shot);
    }
}
