//! Local stream transport for erd.
//!
//! This is the lowest layer of the workspace: a Unix domain socket listener
//! and stream, plus the rules for where the daemon socket lives. The wire
//! protocol and the RPC loops build on the [`IpcStream`] provided here.

pub mod error;
pub mod path;

#[cfg(unix)]
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use path::{SocketPathConfig, SOCKET_ENV, SOCKET_NAME};

#[cfg(unix)]
pub use stream::IpcStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
