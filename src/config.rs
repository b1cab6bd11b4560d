//! Tunable constants, centralized the way `ThreatConfig`/`KeyPolicy`
//! centralize theirs in the keystore this crate was adapted from —
//! one struct instead of scattered magic numbers, with a `Default`
//! that matches the behavior described by the source implementation.

use std::time::Duration;

/// Scan and validation tunables for one extraction run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Minimum admissible region size. Regions smaller than this are
    /// skipped by the backend during enumeration.
    pub min_region_bytes: u64,
    /// Regions larger than this are split into chunks of this size.
    pub chunk_bytes: u64,
    /// At most this many chunks are scanned per source region.
    pub max_chunks_per_region: u32,
    /// PBKDF2-HMAC-SHA512 round count for the encryption-key derivation.
    pub db_key_iterations: u32,
    /// PBKDF2-HMAC-SHA512 round count for the MAC-key derivation.
    pub db_mac_iterations: u32,
    /// Debugger-driven read deadline (Variant B backend only).
    pub debugger_read_timeout: Duration,
    /// Byte returned by [`crate::XorKeyProbe`] when no thumbnail confirms one.
    pub default_xor_byte: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_region_bytes: 1024 * 1024,
            chunk_bytes: 64 * 1024 * 1024,
            max_chunks_per_region: 3,
            db_key_iterations: 256_000,
            db_mac_iterations: 2,
            debugger_read_timeout: Duration::from_secs(30),
            default_xor_byte: 0x37,
        }
    }
}
