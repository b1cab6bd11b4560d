//! `wxgf` sub-decode: a custom animation container wrapping an H.265
//! bitstream in start-code-delimited partitions. Per spec, the
//! "anime-like" multi-partition case is out of scope here — this picks
//! the single largest partition and hands it to the transcoder.

use crate::Transcoder;

const START_CODE_4: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
const START_CODE_3: [u8; 3] = [0x00, 0x00, 0x01];

/// Result of the `wxgf` sub-decode.
pub enum Transcoded {
    Jpeg(Vec<u8>),
    RawH265(Vec<u8>),
}

pub fn decode(data: &[u8], transcoder: &dyn Transcoder) -> Transcoded {
    if data.len() < 5 {
        return Transcoded::RawH265(data.to_vec());
    }
    let header_len = (data[4] as usize).min(data.len());
    let region = &data[header_len..];

    let mut partitions = scan_partitions(data, header_len, &START_CODE_4);
    if partitions.is_empty() {
        partitions = scan_partitions(data, header_len, &START_CODE_3);
    }

    let Some(&(start, len)) = partitions.iter().max_by_key(|&&(_, len)| len) else {
        return Transcoded::RawH265(region.to_vec());
    };

    let bitstream = &region[start..start + len];
    match transcoder.transcode_h265_to_jpeg(bitstream) {
        Ok(jpeg) => Transcoded::Jpeg(jpeg),
        Err(_) => Transcoded::RawH265(bitstream.to_vec()),
    }
}

/// Scan the post-header `region` (`data[header_len..]`) for
/// `start_code`, recording `(region-relative offset, length)` for every
/// hit whose preceding 4-byte big-endian length field is valid. The
/// length prefix is read from `data` at the hit's absolute position, so
/// a hit within the first 4 bytes of `region` is only rejected when
/// `header_len + cursor < 4` leaves no room for a prefix at all. After a
/// valid hit, the cursor jumps past the whole partition; otherwise it
/// advances one byte at a time.
fn scan_partitions(data: &[u8], header_len: usize, start_code: &[u8]) -> Vec<(usize, usize)> {
    let region = &data[header_len..];
    let mut partitions = Vec::new();
    let mut cursor = 0usize;
    while cursor + start_code.len() <= region.len() {
        let abs = header_len + cursor;
        if &region[cursor..cursor + start_code.len()] == start_code && abs >= 4 {
            let len_bytes: [u8; 4] = data[abs - 4..abs].try_into().unwrap();
            let length = u32::from_be_bytes(len_bytes) as usize;
            if length > 0 && cursor + length <= region.len() {
                partitions.push((cursor, length));
                cursor += length;
                continue;
            }
        }
        cursor += 1;
    }
    partitions
}
