//! Where the daemon socket lives.
//!
//! Resolution order: the `ERD_SOCKET` override, then
//! `<XDG_RUNTIME_DIR>/erd.sock` (or `erd-<pid>.sock` for a per-process
//! daemon), then the same file name under `/tmp`.

use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable holding an explicit socket path.
pub const SOCKET_ENV: &str = "ERD_SOCKET";

/// Environment variable naming the per-user runtime directory.
pub const RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

/// Base file name of the socket.
pub const SOCKET_NAME: &str = "erd";

const FALLBACK_DIR: &str = "/tmp";

/// Inputs to socket path resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketPathConfig {
    /// Explicit path; wins over everything else.
    pub override_path: Option<PathBuf>,
    /// Runtime directory; `/tmp` is used when absent.
    pub runtime_dir: Option<PathBuf>,
    /// Suffix the file name with this pid (`erd-<pid>.sock`).
    pub unique_pid: Option<u32>,
}

impl SocketPathConfig {
    /// Read the override and runtime directory from the process environment.
    pub fn from_env() -> Self {
        Self {
            override_path: non_empty(std::env::var_os(SOCKET_ENV)),
            runtime_dir: non_empty(std::env::var_os(RUNTIME_DIR_ENV)),
            unique_pid: None,
        }
    }

    /// Use a per-process socket name derived from the current pid.
    pub fn unique(mut self) -> Self {
        self.unique_pid = Some(std::process::id());
        self
    }

    /// Resolve the final socket path.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.override_path {
            return path.clone();
        }

        let dir = self
            .runtime_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR));
        let file = match self.unique_pid {
            Some(pid) => format!("{SOCKET_NAME}-{pid}.sock"),
            None => format!("{SOCKET_NAME}.sock"),
        };
        dir.join(file)
    }
}

fn non_empty(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}
