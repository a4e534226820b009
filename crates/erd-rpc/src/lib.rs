//! Request/response plumbing between erd clients and the daemon.
//!
//! The [`Daemon`] owns one [`Reader`](erd_sensor::Reader) and one listening
//! socket and serves connections one at a time. The [`Client`] holds a single
//! connection and issues strictly alternating request/response calls.

pub mod client;
pub mod daemon;
pub mod error;

pub use client::{Client, ClientConfig};
pub use daemon::{handle_request, Daemon, DaemonConfig};
pub use error::{Result, RpcError};
