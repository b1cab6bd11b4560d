#![no_main]

use libfuzzer_sys::fuzz_target;
use wechat_keyforge::{FfmpegTranscoder, ImageContainerDecoder};

fuzz_target!(|data: &[u8]| {
    let key = [0u8; 16];
    let transcoder = FfmpegTranscoder;
    let _ = ImageContainerDecoder::decode(data, &key, 0x37, &transcoder);
});
