//! Error taxonomy. Hand-rolled `Display` + `std::error::Error`, matching
//! the rest of the corpus: kinds, not exception hierarchies.

use std::fmt;

/// Errors a [`crate::MemoryBackend`] implementation can report.
///
/// `RegionUnreadable` and friends are recovered locally by the
/// [`crate::Extractor`] (skip that region); only `PermissionDenied` and
/// `TargetGone` abort the whole extraction.
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Cannot attach to the target process. On the debugger-driven
    /// backend this also covers "kernel memory protection is enabled".
    PermissionDenied(String),
    /// The PID disappeared between discovery and `open_target`.
    TargetGone(u32),
    /// A single region read failed; the caller should skip the region.
    RegionUnreadable { base: u64, reason: String },
    /// A debugger-driven read did not complete within its deadline.
    Timeout { base: u64, len: u64 },
    /// Any other I/O or subprocess failure not covered above.
    Io(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied(msg) => write!(f, "permission denied: {msg}"),
            Self::TargetGone(pid) => write!(f, "target process {pid} is gone"),
            Self::RegionUnreadable { base, reason } => {
                write!(f, "region at 0x{base:x} unreadable: {reason}")
            }
            Self::Timeout { base, len } => {
                write!(f, "read of {len} bytes at 0x{base:x} timed out")
            }
            Self::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Errors surfaced by the decoder on untrusted on-disk container bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderError {
    /// Container is shorter than the 15-byte header.
    TooShort,
    /// No known magic matched after all zones were reassembled.
    UnknownImageFormat,
    /// A `wxgf` partition scan found a length field pointing past the
    /// end of the buffer.
    InvalidPartition,
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "container shorter than the 15-byte header"),
            Self::UnknownImageFormat => write!(f, "no known image magic after reassembly"),
            Self::InvalidPartition => write!(f, "wxgf partition length out of bounds"),
        }
    }
}

impl std::error::Error for DecoderError {}

/// Top-level error for the extraction pipeline.
///
/// Most failure modes here degrade gracefully rather than abort: an
/// oracle that can't find its sample file just means that key is
/// reported as `None`, not that extraction fails.
#[derive(Debug, Clone)]
pub enum ExtractError {
    /// Neither the database file nor a sample encrypted image could be
    /// located under the target's data directory.
    OracleUnavailable(&'static str),
    /// The database file exists but begins with the plaintext SQLite
    /// magic — it isn't encrypted, so there's nothing to validate a
    /// candidate key against.
    PlaintextDatabase,
    /// A container failed to decode.
    Decoder(DecoderError),
    /// The external transcoder collaborator failed; the caller already
    /// has the raw H.265 bitstream as a fallback.
    TranscoderFailure(String),
    /// The backend reported a fatal (non-recoverable) error.
    Backend(BackendError),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OracleUnavailable(which) => write!(f, "{which} oracle unavailable: no sample file found"),
            Self::PlaintextDatabase => write!(f, "database is not encrypted"),
            Self::Decoder(e) => write!(f, "decode error: {e}"),
            Self::TranscoderFailure(msg) => write!(f, "transcoder failed: {msg}"),
            Self::Backend(e) => write!(f, "backend error: {e}"),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<DecoderError> for ExtractError {
    fn from(e: DecoderError) -> Self {
        Self::Decoder(e)
    }
}

impl From<BackendError> for ExtractError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}
