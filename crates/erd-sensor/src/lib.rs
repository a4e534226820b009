//! RAPL energy counters: types, sensor resolution and reading arithmetic.
//!
//! A [`Reader`] is built once from [`Attributes`] (domain + socket). The
//! powercap backend resolves the matching zone under
//! `/sys/class/powercap/intel-rapl`, keeps `energy_uj` open for the reader's
//! lifetime and caches `max_energy_range_uj` to correct counter wraparound.
//! The no-op backend stands in on hosts without RAPL.

pub mod clock;
pub mod error;
pub mod nop;
pub mod reader;
pub mod resolver;
pub mod topology;
pub mod types;

mod sysfs;

#[cfg(test)]
mod testutil;

pub use clock::ClockSource;
pub use error::{ErrorKind, Result, SensorError};
pub use nop::NopReader;
pub use reader::{subtract_energy, Backend, EnergyReader, PowercapReader, Reader, ReaderConfig};
pub use resolver::{resolve, resolve_sensor, ResolvedSensor, SensorRoots, MAX_SUBZONES};
pub use topology::count_sockets;
pub use types::{Attributes, Difference, Domain, Microjoules, Reading, Timestamp};
