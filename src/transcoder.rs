//! The external media-transcoder collaborator (spec §6): an opaque
//! byte-in/byte-out process, not implemented by this crate beyond the
//! one real backend that shells out to `ffmpeg`.

use std::io::Write;
use std::process::{Command, Stdio};

/// Why a transcode attempt failed.
#[derive(Debug)]
pub struct TranscoderError(pub String);

impl std::fmt::Display for TranscoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transcode failed: {}", self.0)
    }
}

impl std::error::Error for TranscoderError {}

/// A collaborator that turns a raw H.265 NAL bitstream into a single
/// JPEG frame. Kept as a trait so the container decoder never spawns a
/// process directly and tests never touch a real `ffmpeg` binary.
pub trait Transcoder {
    fn transcode_h265_to_jpeg(&self, nal: &[u8]) -> Result<Vec<u8>, TranscoderError>;
}

/// Shells out to `ffmpeg -i - -vframes 1 -c:v mjpeg -q:v 4 -f image2 -`.
pub struct FfmpegTranscoder;

impl Transcoder for FfmpegTranscoder {
    fn transcode_h265_to_jpeg(&self, nal: &[u8]) -> Result<Vec<u8>, TranscoderError> {
        let mut child = Command::new("ffmpeg")
            .args(["-i", "-", "-vframes", "1", "-c:v", "mjpeg", "-q:v", "4", "-f", "image2", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TranscoderError(e.to_string()))?;

        let mut stdin = child.stdin.take().ok_or_else(|| TranscoderError("no stdin pipe".into()))?;
        let nal = nal.to_vec();
        // Writing stdin and draining stdout must run concurrently: once the
        // JPEG ffmpeg produces exceeds the stdout pipe buffer, it blocks on
        // a full pipe while we'd still be blocked writing the NAL, deadlock.
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            stdin.write_all(&nal)?;
            drop(stdin);
            Ok(())
        });

        let output = child.wait_with_output().map_err(|e| TranscoderError(e.to_string()))?;
        writer
            .join()
            .map_err(|_| TranscoderError("stdin writer thread panicked".into()))?
            .map_err(|e| TranscoderError(e.to_string()))?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(TranscoderError(format!("ffmpeg exit status {}", output.status)));
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A transcoder that never succeeds — used to exercise the raw
    /// H.265 fallback path in decode tests without invoking ffmpeg.
    pub struct StubTranscoder {
        fail: bool,
    }

    impl StubTranscoder {
        pub fn always_fail() -> Self {
            Self { fail: true }
        }

        pub fn always_succeed() -> Self {
            Self { fail: false }
        }
    }

    impl Transcoder for StubTranscoder {
        fn transcode_h265_to_jpeg(&self, nal: &[u8]) -> Result<Vec<u8>, TranscoderError> {
            if self.fail {
                Err(TranscoderError("stub always fails".into()))
            } else {
                Ok(vec![0xFF, 0xD8, 0xFF, b'J'].into_iter().chain(nal.iter().copied()).collect())
            }
        }
    }
}
