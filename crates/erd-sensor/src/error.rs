use std::path::PathBuf;

use crate::types::Domain;

/// Coarse classification shared by every erd error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// OS-level I/O failure.
    System,
    /// The request named something that does not exist on this host.
    InvalidArgument,
    /// A frame or value violated the wire protocol.
    BadMessage,
}

/// Errors raised while resolving or reading an energy sensor.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// Reading a sysfs file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested socket index is not present on this host.
    #[error("system has {available} sockets but socket {requested} was requested")]
    SocketOutOfRange { requested: u32, available: u32 },

    /// A top-level zone is not a package zone.
    #[error("zone {path} does not point to a package domain (name '{name}')")]
    NotAPackage { path: PathBuf, name: String },

    /// The package number in a zone name could not be parsed.
    #[error("malformed package number in zone name '{0}'")]
    BadPackageNumber(String),

    /// A zone name matched none of the known domains.
    #[error("no domain name matches '{0}'")]
    UnknownDomainName(String),

    /// No package zone carries the requested socket number.
    #[error("no matching package zone found for socket {0}")]
    SocketNotFound(u32),

    /// The package has no sub-zone for the requested domain.
    #[error("no {domain} domain was found for socket {socket}")]
    DomainNotFound { domain: Domain, socket: u32 },

    /// A counter file held something other than a decimal integer.
    #[error("failed to parse counter value from {path}: '{content}'")]
    BadCounter { path: PathBuf, content: String },
}

impl SensorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SensorError::Io { .. } => ErrorKind::System,
            _ => ErrorKind::InvalidArgument,
        }
    }

    /// The native OS error code, for `System` errors that carry one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SensorError::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SensorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_system_errors() {
        let err = SensorError::io(
            "/sys/x",
            std::io::Error::from_raw_os_error(libc::EACCES),
        );
        assert_eq!(err.kind(), ErrorKind::System);
        assert_eq!(err.raw_os_error(), Some(libc::EACCES));
    }

    #[test]
    fn lookup_failures_are_invalid_arguments() {
        let err = SensorError::SocketOutOfRange {
            requested: 4,
            available: 2,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.raw_os_error(), None);
        assert_eq!(
            err.to_string(),
            "system has 2 sockets but socket 4 was requested"
        );
    }
}
