#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;
use wechat_keyforge::{DbKeyOracle, ImageKeyOracle, ScanConfig};

static DB_ORACLE: Lazy<DbKeyOracle> = Lazy::new(|| {
    let config = ScanConfig::default();
    let mut page = vec![0u8; 4096];
    for (i, b) in page.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    DbKeyOracle::from_page_bytes(&page, &config).unwrap()
});

static IMAGE_ORACLE: Lazy<ImageKeyOracle> =
    Lazy::new(|| ImageKeyOracle::from_ciphertext_block([0x55u8; 16]));

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let split = (data[0] as usize) % (data.len() + 1);
    let (db_candidate, image_candidate) = data.split_at(split);

    let _ = DB_ORACLE.validate(db_candidate);
    let _ = IMAGE_ORACLE.validate(image_candidate);
});
