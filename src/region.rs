//! Memory region shapes and the chunking rule, kept as pure functions
//! so they're testable without a live process or any OS FFI.

use crate::config::ScanConfig;

/// A single contiguous, readable, writable, private region of the
/// target's address space, or one chunk of a larger one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
    pub protect_flags: u32,
}

/// A freshly read byte sequence backing a [`MemoryRegion`] at a point
/// in time. Not stable — the target may mutate before the next read.
#[derive(Clone, Debug)]
pub struct MemoryBlock {
    pub base: u64,
    pub bytes: Vec<u8>,
}

/// Split `region` into admissible scan chunks per the backend's bounds:
/// chunks of at most `chunk_bytes`, capped at `max_chunks_per_region`
/// chunks total (the heuristic bound on scanning cost — a single
/// oversized region, e.g. a 2 GiB arena, is sampled, not fully walked).
///
/// `region` is assumed to already have passed the `min_region_bytes`
/// floor; this function only handles the split/cap side.
pub fn chunk_region(region: MemoryRegion, config: &ScanConfig) -> Vec<MemoryRegion> {
    if region.size <= config.chunk_bytes {
        return vec![region];
    }

    let mut chunks = Vec::new();
    let mut offset = 0u64;
    while offset < region.size && (chunks.len() as u32) < config.max_chunks_per_region {
        let remaining = region.size - offset;
        let this_len = remaining.min(config.chunk_bytes);
        chunks.push(MemoryRegion {
            base: region.base + offset,
            size: this_len,
            protect_flags: region.protect_flags,
        });
        offset += this_len;
    }
    chunks
}

/// Whether a raw region (as reported by the OS) passes the admission
/// filter: big enough to bother with. Backends apply their own
/// committed/read-write/private checks before calling this; this is
/// just the size floor, shared across both backends.
pub fn is_admissible(size: u64, config: &ScanConfig) -> bool {
    size >= config.min_region_bytes
}
