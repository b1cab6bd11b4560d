//! # wechat-keyforge
//!
//! Recovers the two cryptographic keys a running IM desktop client keeps
//! resident in its own heap, then uses them to decode the client's
//! on-disk encrypted image containers.
//!
//! Two keys are in scope:
//!
//! - a 32-byte **database key**, validated by replaying the client's own
//!   PBKDF2 → HMAC-SHA512 derivation against a real encrypted database
//!   page and comparing the stored MAC;
//! - a 16-byte **image key**, validated by trial AES-128-ECB decryption
//!   of a real encrypted image header and checking for a known magic.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wechat_keyforge::{Extractor, KeyScanner, ScanConfig, ProcessRecord, ProcessStatus};
//!
//! # fn example(backend: impl wechat_keyforge::MemoryBackend) -> Result<(), Box<dyn std::error::Error>> {
//! let records = vec![ProcessRecord {
//!     pid: 4242,
//!     exe_path: "/Applications/WeChat.app/Contents/MacOS/WeChat".into(),
//!     data_dir: Some("/Users/alice/Library/Containers/com.tencent.xinWeChat".into()),
//!     account_name: None,
//!     status: ProcessStatus::Online,
//!     version: 4,
//!     full_version: None,
//! }];
//!
//! let extractor = Extractor::new(backend, KeyScanner::DirectPattern, ScanConfig::default());
//! let report = extractor.extract(&records)?;
//! println!("db key: {:?}, image key: {:?}", report.db_key_hex, report.image_key_hex);
//! # Ok(())
//! # }
//! ```
//!
//! ## What this crate does NOT do
//!
//! - Persist or escrow recovered keys (callers own that decision).
//! - Discover running processes (see [`ProcessRecord`] — that's an
//!   external collaborator's job).
//! - Parse message databases or protobufs past the one validation page.
//! - Provide a CLI. This is a library only.

#![deny(unsafe_code)]

mod aesecb;
mod config;
mod container;
mod db_oracle;
mod error;
mod extractor;
mod image_oracle;
mod process;
mod region;
mod scanner;
mod transcoder;
mod wxgf;
mod xor_probe;

pub use config::ScanConfig;
pub use container::{DecodedImage, ImageContainerDecoder};
pub use db_oracle::DbKeyOracle;
pub use error::{DecoderError, ExtractError};
pub use extractor::{ExtractionReport, Extractor, ScanStats};
pub use image_oracle::ImageKeyOracle;
pub use process::{ProcessRecord, ProcessStatus};
pub use region::{is_admissible, MemoryBlock, MemoryRegion};
pub use scanner::{CandidateKey, KeyScanner};
pub use transcoder::{FfmpegTranscoder, Transcoder, TranscoderError};
pub use xor_probe::XorKeyProbe;

/// Capability interface a platform backend must implement to let the
/// [`Extractor`] enumerate and read a target process's address space.
///
/// Two concrete implementations live in the sibling `wechat-keyforge-backend`
/// crate — one per supported host OS. This crate never names an
/// OS-specific handle type; `Handle` is opaque from here.
pub trait MemoryBackend {
    /// Opaque, backend-owned reference to an attached target process.
    type Handle;

    /// Attach to `pid`. Fails with `PermissionDenied` if the caller lacks
    /// the required privilege, `TargetGone` if the PID no longer exists.
    fn open_target(&self, pid: u32) -> Result<Self::Handle, BackendError>;

    /// Single-pass enumeration of writable private regions, ascending by
    /// base address, already filtered and chunked per [`region`] rules.
    fn enumerate_regions(&self, handle: &Self::Handle) -> Result<Vec<MemoryRegion>, BackendError>;

    /// Read `len` bytes starting at `base`. `Ok(None)` means the region
    /// became unreadable; this is not a hard failure and the caller
    /// should simply move on to the next region.
    fn read(&self, handle: &Self::Handle, base: u64, len: u64) -> Result<Option<Vec<u8>>, BackendError>;

    /// Release the target. Must be safe to call exactly once per handle.
    fn close_target(&self, handle: Self::Handle);
}

pub use error::BackendError;
