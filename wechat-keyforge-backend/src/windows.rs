//! Variant A: Windows, driven directly through the kernel's process
//! introspection API — no external process required.

use std::ffi::c_void;

use windows_sys::Win32::Foundation::{CloseHandle, ERROR_ACCESS_DENIED, HANDLE};
use windows_sys::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows_sys::Win32::System::Memory::{
    VirtualQueryEx, MEMORY_BASIC_INFORMATION, MEM_COMMIT, MEM_PRIVATE, PAGE_READWRITE,
};
use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

use wechat_keyforge::{is_admissible, BackendError, MemoryBackend, MemoryRegion, ScanConfig};

const SCAN_START_ADDRESS: u64 = 0x10000;

/// Wraps a raw `HANDLE`. `Send`/`Sync` are sound here: the handle is
/// only ever read through the Win32 API, which is thread-safe for
/// concurrent use against a single target, and this backend never
/// hands out mutable access to it.
pub struct ProcessHandle(HANDLE);

unsafe impl Send for ProcessHandle {}
unsafe impl Sync for ProcessHandle {}

pub struct WindowsKernelBackend {
    config: ScanConfig,
}

impl WindowsKernelBackend {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

impl MemoryBackend for WindowsKernelBackend {
    type Handle = ProcessHandle;

    fn open_target(&self, pid: u32) -> Result<ProcessHandle, BackendError> {
        // SAFETY: `OpenProcess` is called with a plain PID and no
        // pointers; the returned handle is owned by this call and
        // closed exactly once in `close_target`.
        let handle = unsafe { OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_INFORMATION, 0, pid) };
        if handle == 0 {
            let err = std::io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(code) if code as u32 == ERROR_ACCESS_DENIED => {
                    Err(BackendError::PermissionDenied(err.to_string()))
                }
                _ => Err(BackendError::TargetGone(pid)),
            };
        }
        Ok(ProcessHandle(handle))
    }

    fn enumerate_regions(&self, handle: &ProcessHandle) -> Result<Vec<MemoryRegion>, BackendError> {
        let mut regions = Vec::new();
        let mut address = SCAN_START_ADDRESS;

        loop {
            let mut info: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };
            // SAFETY: `info` is a local, correctly-sized buffer;
            // `VirtualQueryEx` writes at most `size_of::<MEMORY_BASIC_INFORMATION>()`
            // bytes into it and returns 0 past the end of the address space.
            let written = unsafe {
                VirtualQueryEx(
                    handle.0,
                    address as *const c_void,
                    &mut info,
                    std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if written == 0 {
                break;
            }

            let region_size = info.RegionSize as u64;
            let admissible = info.State == MEM_COMMIT
                && info.Protect == PAGE_READWRITE
                && info.Type == MEM_PRIVATE
                && is_admissible(region_size, &self.config);
            if admissible {
                regions.push(MemoryRegion {
                    base: info.BaseAddress as u64,
                    size: region_size,
                    protect_flags: info.Protect,
                });
            }

            let next = (info.BaseAddress as u64).saturating_add(region_size.max(1));
            if next <= address {
                break;
            }
            address = next;
        }

        Ok(regions)
    }

    fn read(&self, handle: &ProcessHandle, base: u64, len: u64) -> Result<Option<Vec<u8>>, BackendError> {
        let mut buffer = vec![0u8; len as usize];
        let mut bytes_read: usize = 0;

        // SAFETY: `buffer` is sized to `len` and the call reports back
        // how many bytes it actually wrote via `bytes_read`, which we
        // use to truncate rather than trust `len` blindly.
        let ok = unsafe {
            ReadProcessMemory(
                handle.0,
                base as *const c_void,
                buffer.as_mut_ptr() as *mut c_void,
                len as usize,
                &mut bytes_read,
            )
        };

        if ok == 0 {
            return Err(BackendError::RegionUnreadable {
                base,
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        buffer.truncate(bytes_read);
        if buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(buffer))
    }

    fn close_target(&self, handle: ProcessHandle) {
        // SAFETY: `handle.0` was returned by `OpenProcess` in
        // `open_target` and is closed exactly once, here.
        unsafe {
            CloseHandle(handle.0);
        }
    }
}
