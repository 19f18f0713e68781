//! Platform-dependent defaults for the worker's environment: bitcoind
//! data directory and URL, unix socket path, worker binary location, and
//! ephemeral port allocation.

use std::io;
use std::net::TcpListener;
use std::path::{Path, PathBuf};

use crate::types::{Network, WORKER_NAME};

/// Host platform, captured once so the default helpers stay testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

/// Default bitcoind data directory under `base`.
///
/// `base` is `%APPDATA%` on Windows and `$HOME` elsewhere; pure string
/// construction, no filesystem access.
pub fn default_bitcoind_dir_in(platform: Platform, base: &Path) -> PathBuf {
    match platform {
        Platform::Windows => base.join("Bitcoin"),
        _ => base.join(".bitcoin"),
    }
}

/// Default bitcoind data directory for the current user, or `None` when
/// the base directory cannot be determined.
pub fn default_bitcoind_dir(platform: Platform) -> Option<PathBuf> {
    let base = match platform {
        Platform::Windows => dirs::config_dir(),
        _ => dirs::home_dir(),
    }?;
    Some(default_bitcoind_dir_in(platform, &base))
}

/// Default bitcoind RPC URL: loopback on the network's fixed port.
pub fn default_bitcoind_url(network: Network) -> String {
    format!("http://localhost:{}/", network.default_rpc_port())
}

/// Default unix socket path for the worker's Electrum server.
///
/// Only available on Linux, and only when the plugin directory is
/// writable and executable by the current user; everywhere else the
/// worker falls back to TCP.
pub fn default_socket_path(platform: Platform, plugin_dir: &Path) -> Option<PathBuf> {
    if platform == Platform::Linux && dir_writable(plugin_dir) {
        Some(plugin_dir.join(format!("{WORKER_NAME}-socket")))
    } else {
        None
    }
}

/// Path of the worker executable inside the plugin directory.
pub fn worker_binary(platform: Platform, plugin_dir: &Path) -> PathBuf {
    match platform {
        Platform::Windows => plugin_dir.join(format!("{WORKER_NAME}.exe")),
        _ => plugin_dir.join(WORKER_NAME),
    }
}

/// Ask the OS for an unused local port by binding an ephemeral listener
/// and immediately releasing it.
///
/// Best-effort: another process can grab the port between release and the
/// worker binding it. That race manifests as the worker's own startup
/// failure and is accepted.
pub fn free_port() -> io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

#[cfg(unix)]
fn dir_writable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // access(2) with W_OK|X_OK, matching "can create a socket file here".
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK | libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn dir_writable(_path: &Path) -> bool {
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
