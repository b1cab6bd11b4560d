//! Platform [`MemoryBackend`](wechat_keyforge::MemoryBackend)
//! implementations: `ReadProcessMemory` on Windows, `vmmap`/`lldb` on
//! macOS. Everything touching raw pointers or FFI lives here so the
//! core crate stays `#![deny(unsafe_code)]`.

pub mod vmmap;

/// Re-exports the shared backend error taxonomy at this crate's own
/// path. `BackendError` is defined in the core crate — the
/// `MemoryBackend` trait it implements lives there — so this module
/// only re-exports rather than redefining it.
pub mod error {
    pub use wechat_keyforge::BackendError;
}

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(windows)]
pub mod windows;

#[cfg(target_os = "macos")]
pub use macos::MacosDebuggerBackend;

#[cfg(windows)]
pub use windows::WindowsKernelBackend;
