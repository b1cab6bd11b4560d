//! Validates a 16-byte candidate against a real encrypted image header
//! by trial AES-128-ECB decryption.

use std::path::Path;

use crate::aesecb::decrypt_ecb_nopad;

const FORMAT2_MAGIC: [u8; 4] = [0x07, 0x08, 0x56, 0x32];
const JPEG_SOI: &[u8] = &[0xFF, 0xD8, 0xFF];
const WXGF_MAGIC: &[u8] = b"wxgf";

/// Built once per extraction from the first matching `.dat` file found
/// under the target's data directory. Degrades gracefully: if no
/// sample file exists, [`ImageKeyOracle::validate`] simply always
/// returns `false` rather than failing construction.
pub struct ImageKeyOracle {
    ciphertext_block: Option<[u8; 16]>,
}

impl ImageKeyOracle {
    /// Walk `data_dir` recursively for the first Format-2 `.dat` file
    /// (excluding `*_t.dat` thumbnails) and capture its ciphertext block.
    pub fn from_data_dir(data_dir: &Path) -> Self {
        Self {
            ciphertext_block: find_sample_ciphertext(data_dir),
        }
    }

    /// Build directly from a known ciphertext block (used by tests).
    pub fn from_ciphertext_block(block: [u8; 16]) -> Self {
        Self { ciphertext_block: Some(block) }
    }

    /// An oracle with no sample — every validation is `false`.
    pub fn unavailable() -> Self {
        Self { ciphertext_block: None }
    }

    pub fn is_available(&self) -> bool {
        self.ciphertext_block.is_some()
    }

    /// Decide whether `candidate[0..16]` is the real image key.
    pub fn validate(&self, candidate: &[u8]) -> bool {
        let Some(block) = self.ciphertext_block else { return false };
        if candidate.len() < 16 {
            return false;
        }
        let Some(plain) = decrypt_ecb_nopad(&candidate[..16], &block) else { return false };
        plain.starts_with(JPEG_SOI) || plain.starts_with(WXGF_MAGIC)
    }
}

fn find_sample_ciphertext(data_dir: &Path) -> Option<[u8; 16]> {
    for entry in walk_files(data_dir) {
        let name = entry.file_name()?.to_str()?.to_string();
        if !name.ends_with(".dat") || name.ends_with("_t.dat") {
            continue;
        }
        let bytes = std::fs::read(&entry).ok()?;
        if bytes.len() >= 31 && bytes[..4] == FORMAT2_MAGIC {
            let mut block = [0u8; 16];
            block.copy_from_slice(&bytes[15..31]);
            return Some(block);
        }
    }
    None
}

/// Recursive file walk helper; swallows per-entry I/O errors (a single
/// unreadable subdirectory shouldn't abort the whole search).
fn walk_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}
