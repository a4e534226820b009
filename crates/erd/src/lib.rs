//! RAPL energy readings for unprivileged processes.
//!
//! A small daemon opens one RAPL energy counter and answers fixed-size
//! requests over a local socket; clients sample it and ask the daemon to
//! subtract samples with wraparound correction.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain socket listener/stream and socket path rules
//! - [`wire`]: Fixed-size request/response frames and unit tags
//! - [`sensor`]: Sensor resolution, powercap and no-op readers
//! - [`rpc`]: Blocking client and single-connection daemon

/// Re-export transport types.
pub mod transport {
    pub use erd_transport::*;
}

/// Re-export wire protocol types.
pub mod wire {
    pub use erd_wire::*;
}

/// Re-export sensor types.
pub mod sensor {
    pub use erd_sensor::*;
}

/// Re-export client and daemon types.
pub mod rpc {
    pub use erd_rpc::*;
}
