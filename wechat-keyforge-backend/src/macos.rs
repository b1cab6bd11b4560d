//! Variant B: macOS, driven entirely through `csrutil`, `vmmap`, and
//! `lldb` subprocesses — no direct `mach_vm_read` call, since a
//! hardened-runtime target without `com.apple.security.cs.debugger`
//! will refuse `task_for_pid` long before this crate gets involved.

use std::ffi::CString;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use wechat_keyforge::{BackendError, MemoryBackend, MemoryRegion, ScanConfig};

use crate::vmmap::parse_writable_regions;

static PIPE_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct MacosDebuggerBackend {
    config: ScanConfig,
}

impl MacosDebuggerBackend {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

impl MemoryBackend for MacosDebuggerBackend {
    type Handle = u32;

    fn open_target(&self, pid: u32) -> Result<u32, BackendError> {
        let preflight = Command::new("csrutil")
            .arg("status")
            .output()
            .map_err(|e| BackendError::Io(e.to_string()))?;
        let text = String::from_utf8_lossy(&preflight.stdout);
        if sip_blocks_reads(&text) {
            return Err(BackendError::PermissionDenied(
                "System Integrity Protection is enabled; attach-based reads are blocked".into(),
            ));
        }

        // SAFETY: `kill(pid, 0)` sends no signal, it only probes
        // whether the pid still belongs to a live process we're
        // permitted to signal.
        let alive = unsafe { libc::kill(pid as libc::pid_t, 0) == 0 };
        if !alive {
            return Err(BackendError::TargetGone(pid));
        }
        Ok(pid)
    }

    fn enumerate_regions(&self, handle: &u32) -> Result<Vec<MemoryRegion>, BackendError> {
        let output = Command::new("vmmap")
            .arg("-wide")
            .arg(handle.to_string())
            .output()
            .map_err(|e| BackendError::Io(e.to_string()))?;
        if !output.status.success() {
            return Err(BackendError::PermissionDenied("vmmap failed to attach to target".into()));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(parse_writable_regions(&text, self.config.min_region_bytes))
    }

    fn read(&self, handle: &u32, base: u64, len: u64) -> Result<Option<Vec<u8>>, BackendError> {
        let pipe_path = make_pipe_path(*handle);
        create_fifo(&pipe_path).map_err(BackendError::Io)?;

        let lldb_command = format!(
            "memory read --binary --force --outfile {} --count {} 0x{:x}",
            pipe_path.display(),
            len,
            base
        );
        let mut child = match Command::new("lldb")
            .arg("-p")
            .arg(handle.to_string())
            .arg("-o")
            .arg(&lldb_command)
            .arg("-o")
            .arg("quit")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                unlink_fifo(&pipe_path);
                return Err(BackendError::Io(e.to_string()));
            }
        };

        let (tx, rx) = mpsc::channel();
        let reader_path = pipe_path.clone();
        std::thread::spawn(move || {
            let result = File::open(&reader_path).and_then(|mut f| {
                let mut buf = Vec::new();
                f.read_to_end(&mut buf)?;
                Ok(buf)
            });
            let _ = tx.send(result);
        });

        let outcome = rx.recv_timeout(self.config.debugger_read_timeout);
        let _ = child.kill();
        let _ = child.wait();
        unlink_fifo(&pipe_path);

        match outcome {
            Ok(Ok(bytes)) if !bytes.is_empty() => Ok(Some(bytes)),
            Ok(Ok(_)) => Ok(None),
            Ok(Err(e)) => Err(BackendError::RegionUnreadable { base, reason: e.to_string() }),
            Err(_) => Err(BackendError::Timeout { base, len }),
        }
    }

    fn close_target(&self, _handle: u32) {}
}

/// `csrutil status` reads "System Integrity Protection status:
/// enabled." or "...disabled." — reads are also permitted when SIP is
/// enabled but the host is booted with debugging entitlements granted
/// ("Debugging Restrictions: disabled").
fn sip_blocks_reads(csrutil_output: &str) -> bool {
    let text = csrutil_output.to_lowercase();
    text.contains("enabled") && !text.contains("debugging restrictions: disabled")
}

fn make_pipe_path(pid: u32) -> PathBuf {
    let n = PIPE_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("wechat-keyforge-{pid}-{n}.pipe"))
}

fn create_fifo(path: &Path) -> Result<(), String> {
    let c_path = CString::new(path.as_os_str().to_string_lossy().into_owned()).map_err(|e| e.to_string())?;
    // SAFETY: `c_path` is a NUL-terminated path we just generated under
    // the system temp dir; `mkfifo` either creates it or returns an
    // error, it never touches Rust-owned memory.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().to_string());
    }
    Ok(())
}

/// Always called, success or failure — a stray fifo left under the
/// temp dir is a leak, not a correctness issue, so errors are ignored.
fn unlink_fifo(path: &Path) {
    if let Ok(c_path) = CString::new(path.as_os_str().to_string_lossy().into_owned()) {
        // SAFETY: unlinking a path this module created above.
        unsafe {
            libc::unlink(c_path.as_ptr());
        }
    }
}
