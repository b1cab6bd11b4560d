//! Validates a 32-byte candidate against a real encrypted database page
//! by replaying the client's own PBKDF2 → HMAC-SHA512 derivation chain.

use std::path::Path;

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::config::ScanConfig;

const PAGE_SIZE: usize = 4096;
const SALT_SIZE: usize = 16;
const MAC_SIZE: usize = 64;
const RESERVE_SIZE: usize = 16 + MAC_SIZE; // IV + MAC, 80 bytes
const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";
const DB_RELATIVE_PATH: &str = "db_storage/message/message_0.db";

type HmacSha512 = Hmac<Sha512>;

/// Built once per extraction from the target's encrypted message
/// database. Construction fails if the file is too short or is
/// actually plaintext (nothing to validate a key against).
pub struct DbKeyOracle {
    first_page: [u8; PAGE_SIZE],
    salt: [u8; SALT_SIZE],
    key_iterations: u32,
    mac_iterations: u32,
}

/// Why [`DbKeyOracle::from_data_dir`] could not build an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOracleError {
    FileTooShort,
    PlaintextDatabase,
    NotFound,
}

impl DbKeyOracle {
    /// Locate and read `<data_dir>/db_storage/message/message_0.db`.
    pub fn from_data_dir(data_dir: &Path, config: &ScanConfig) -> Result<Self, DbOracleError> {
        let path = data_dir.join(DB_RELATIVE_PATH);
        let bytes = std::fs::read(&path).map_err(|_| DbOracleError::NotFound)?;
        Self::from_page_bytes(&bytes, config)
    }

    /// Build directly from the first bytes of a database file (used by
    /// tests and by `from_data_dir`).
    pub fn from_page_bytes(bytes: &[u8], config: &ScanConfig) -> Result<Self, DbOracleError> {
        if bytes.len() < PAGE_SIZE {
            return Err(DbOracleError::FileTooShort);
        }
        if bytes.starts_with(SQLITE_MAGIC) {
            return Err(DbOracleError::PlaintextDatabase);
        }
        let mut first_page = [0u8; PAGE_SIZE];
        first_page.copy_from_slice(&bytes[..PAGE_SIZE]);
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&first_page[..SALT_SIZE]);
        Ok(Self {
            first_page,
            salt,
            key_iterations: config.db_key_iterations,
            mac_iterations: config.db_mac_iterations,
        })
    }

    /// Decide whether `candidate` is the real database key.
    ///
    /// Never panics on a malformed candidate — length mismatches and
    /// any downstream crypto failure both simply yield `false`.
    pub fn validate(&self, candidate: &[u8]) -> bool {
        if candidate.len() != 32 {
            return false;
        }

        let mut enc_key = [0u8; 32];
        pbkdf2_hmac::<Sha512>(candidate, &self.salt, self.key_iterations, &mut enc_key);

        let mut mac_salt = [0u8; SALT_SIZE];
        for i in 0..SALT_SIZE {
            mac_salt[i] = self.salt[i] ^ 0x3A;
        }

        let mut mac_key = [0u8; 32];
        pbkdf2_hmac::<Sha512>(&enc_key, &mac_salt, self.mac_iterations, &mut mac_key);

        let body_end = PAGE_SIZE - RESERVE_SIZE + SALT_SIZE; // 4096 - 80 + 16 = 4032
        let mut mac = match HmacSha512::new_from_slice(&mac_key) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(&self.first_page[SALT_SIZE..body_end]);
        mac.update(&1u32.to_le_bytes());
        let computed = mac.finalize().into_bytes();

        let stored = &self.first_page[body_end..PAGE_SIZE];
        computed.as_slice().ct_eq(stored).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_mac(key: &[u8; 32], salt: &[u8; 16], first_page_body: &[u8], cfg: &ScanConfig) -> [u8; 64] {
        let mut enc_key = [0u8; 32];
        pbkdf2_hmac::<Sha512>(key, salt, cfg.db_key_iterations, &mut enc_key);
        let mut mac_salt = [0u8; 16];
        for i in 0..16 {
            mac_salt[i] = salt[i] ^ 0x3A;
        }
        let mut mac_key = [0u8; 32];
        pbkdf2_hmac::<Sha512>(&enc_key, &mac_salt, cfg.db_mac_iterations, &mut mac_key);
        let mut mac = HmacSha512::new_from_slice(&mac_key).unwrap();
        mac.update(first_page_body);
        mac.update(&1u32.to_le_bytes());
        let mut out = [0u8; 64];
        out.copy_from_slice(&mac.finalize().into_bytes());
        out
    }

    fn build_synthetic_page(key: &[u8; 32], cfg: &ScanConfig) -> (Vec<u8>, [u8; 16]) {
        let mut salt = [0u8; 16];
        for (i, b) in salt.iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut page = vec![0u8; PAGE_SIZE];
        page[..16].copy_from_slice(&salt);
        for (i, b) in page[16..4032].iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let mac = derive_mac(key, &salt, &page[16..4032], cfg);
        page[4032..4096].copy_from_slice(&mac);
        (page, salt)
    }

    #[test]
    fn rejects_plaintext_database() {
        let cfg = ScanConfig::default();
        let mut page = vec![0u8; PAGE_SIZE];
        page[..SQLITE_MAGIC.len()].copy_from_slice(SQLITE_MAGIC);
        assert_eq!(
            DbKeyOracle::from_page_bytes(&page, &cfg).unwrap_err(),
            DbOracleError::PlaintextDatabase
        );
    }

    #[test]
    fn rejects_short_file() {
        let cfg = ScanConfig::default();
        let page = vec![0u8; PAGE_SIZE - 1];
        assert_eq!(
            DbKeyOracle::from_page_bytes(&page, &cfg).unwrap_err(),
            DbOracleError::FileTooShort
        );
    }

    #[test]
    fn accepts_correct_key_and_rejects_bitflip() {
        let cfg = ScanConfig::default();
        let key0 = [0x42u8; 32];
        let (page, _) = build_synthetic_page(&key0, &cfg);
        let oracle = DbKeyOracle::from_page_bytes(&page, &cfg).unwrap();
        assert!(oracle.validate(&key0));

        let mut flipped = key0;
        flipped[0] ^= 0x01;
        assert!(!oracle.validate(&flipped));
    }

    #[test]
    fn rejects_wrong_length_candidate() {
        let cfg = ScanConfig::default();
        let key0 = [0x11u8; 32];
        let (page, _) = build_synthetic_page(&key0, &cfg);
        let oracle = DbKeyOracle::from_page_bytes(&page, &cfg).unwrap();
        assert!(!oracle.validate(&key0[..31]));
        assert!(!oracle.validate(&[&key0[..], &[0u8]].concat()));
    }

    proptest::proptest! {
        #[test]
        fn never_panics_on_arbitrary_candidate(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64)) {
            let cfg = ScanConfig::default();
            let key0 = [0x77u8; 32];
            let (page, _) = build_synthetic_page(&key0, &cfg);
            let oracle = DbKeyOracle::from_page_bytes(&page, &cfg).unwrap();
            let _ = oracle.validate(&bytes);
        }
    }
}
