//! Shared AES-128-ECB decrypt helper. ECB here is a deliberate trial-
//! decryption oracle and container cipher, not a confidentiality
//! mechanism this crate vouches for — see [`crate::image_oracle`] and
//! [`crate::container`].

use aes::Aes128;
use ecb::cipher::block_padding::NoPadding;
use ecb::cipher::{BlockDecryptMut, KeyInit};

type Aes128EcbDec = ecb::Decryptor<Aes128>;

/// Decrypt `data` (must be a non-empty, block-size multiple) under
/// `key` (must be exactly 16 bytes), no padding removed. `None` on any
/// size mismatch or cipher construction failure — never panics.
pub fn decrypt_ecb_nopad(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    if key.len() != 16 || data.is_empty() || data.len() % 16 != 0 {
        return None;
    }
    let cipher = Aes128EcbDec::new_from_slice(key).ok()?;
    let mut buf = data.to_vec();
    let len = cipher.decrypt_padded_mut::<NoPadding>(&mut buf).ok()?.len();
    buf.truncate(len);
    Some(buf)
}
