//! Scan strategies over a raw memory block. Pure functions on byte
//! slices — no OS dependency, so the right/wrong candidate positions
//! can be pinned down with plain unit tests.

use std::collections::HashSet;

use zeroize::Zeroize;

/// A candidate key recovered from a memory block, not yet validated.
///
/// Zeroized on drop; the dedup set stores only its hex encoding, never
/// the bytes themselves, so a rejected candidate leaves nothing behind.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct CandidateKey(Vec<u8>);

impl CandidateKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(&self.0)
    }
}

/// Signature the pointer-chasing strategy (Variant A / Windows hosts)
/// looks for: two little-endian u64 fields, `0x20` then `0x2F`, packed
/// back to back.
const POINTER_CHASE_SIGNATURE: [u8; 24] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x2F, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// `" fts5(%\0"` — the SQLite FTS5 config literal the DB key tends to
/// sit near on the heap.
const DB_KEY_PATTERN: [u8; 8] = [0x20, 0x66, 0x74, 0x73, 0x35, 0x28, 0x25, 0x00];

const DB_KEY_OFFSETS: [i64; 3] = [16, -80, 64];
const IMAGE_KEY_OFFSETS: [i64; 1] = [-32];

const USER_SPACE_LOW: u64 = 0x10000;
const USER_SPACE_HIGH: u64 = 0x7FFF_FFFF_FFFF;

/// A location found in a memory block, paired with what still needs to
/// happen to turn it into key bytes.
pub enum RawCandidate {
    /// Variant A: a pointer to dereference with a follow-up 32-byte read.
    PointerFollowUp(u64),
    /// Variant B: key bytes already present inline in the block.
    Inline(CandidateKey),
}

/// Per-scan, per-oracle dedup set keyed by hex encoding.
#[derive(Default)]
pub struct DedupSet(HashSet<String>);

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a given candidate's hex encoding is
    /// seen, `false` on every subsequent occurrence.
    pub fn insert(&mut self, candidate: &CandidateKey) -> bool {
        self.0.insert(candidate.hex())
    }
}

/// Scan strategy selection, mirroring which backend produced the block.
pub enum KeyScanner {
    /// Pointer-chasing scan: search for the fixed 24-byte signature,
    /// interpret the preceding 8 bytes as a user-space pointer, and
    /// leave the follow-up read to the caller (it needs live access to
    /// the target, which a pure scanner doesn't have).
    PointerChase,
    /// Direct pattern scan: DB-key and image-key candidates are read
    /// straight out of the block at fixed offsets from their anchors.
    DirectPattern,
}

impl KeyScanner {
    /// Scan `block` right-to-left (last occurrence first — recently
    /// allocated key material tends to live there) and emit every
    /// candidate this strategy can find.
    pub fn scan(&self, block: &[u8]) -> Vec<RawCandidate> {
        match self {
            KeyScanner::PointerChase => scan_pointer_chase(block),
            KeyScanner::DirectPattern => {
                let mut out = scan_db_key_pattern(block);
                out.extend(scan_image_key_pattern(block));
                out
            }
        }
    }
}

fn find_rtl(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }
    let mut hits = Vec::new();
    let mut i = haystack.len() - needle.len() + 1;
    while i > 0 {
        i -= 1;
        if &haystack[i..i + needle.len()] == needle {
            hits.push(i);
        }
    }
    hits
}

fn scan_pointer_chase(block: &[u8]) -> Vec<RawCandidate> {
    let mut out = Vec::new();
    for i in find_rtl(block, &POINTER_CHASE_SIGNATURE) {
        if i < 8 {
            continue;
        }
        let mut ptr_bytes = [0u8; 8];
        ptr_bytes.copy_from_slice(&block[i - 8..i]);
        let ptr = u64::from_le_bytes(ptr_bytes);
        if ptr > USER_SPACE_LOW && ptr < USER_SPACE_HIGH {
            out.push(RawCandidate::PointerFollowUp(ptr));
        }
    }
    out
}

fn scan_db_key_pattern(block: &[u8]) -> Vec<RawCandidate> {
    let mut out = Vec::new();
    let len = block.len() as i64;
    for i in find_rtl(block, &DB_KEY_PATTERN) {
        let i = i as i64;
        for offset in DB_KEY_OFFSETS {
            let start = i + offset;
            if start >= 0 && start + 32 <= len {
                let start = start as usize;
                out.push(RawCandidate::Inline(CandidateKey::new(
                    block[start..start + 32].to_vec(),
                )));
            }
        }
    }
    out
}

fn scan_image_key_pattern(block: &[u8]) -> Vec<RawCandidate> {
    let zero16 = [0u8; 16];
    let mut out = Vec::new();
    let len = block.len() as i64;
    for i in find_rtl(block, &zero16) {
        let i = i as i64;
        for offset in IMAGE_KEY_OFFSETS {
            let start = i + offset;
            if start >= 0 && start + 16 <= len {
                let start = start as usize;
                let slice = &block[start..start + 16];
                if slice != zero16 {
                    out.push(RawCandidate::Inline(CandidateKey::new(slice.to_vec())));
                }
            }
        }
    }
    out
}
