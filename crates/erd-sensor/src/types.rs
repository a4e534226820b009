use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A RAPL energy-accounting region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// The entire socket.
    Package,
    /// Power plane 0: the cores.
    Cores,
    /// Power plane 1: uncore (typically the integrated GPU).
    Uncore,
    /// Memory attached to the socket.
    Dram,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Package, Domain::Cores, Domain::Uncore, Domain::Dram];

    /// Prefix of the powercap `name` file identifying this domain.
    pub const fn zone_prefix(self) -> &'static str {
        match self {
            Domain::Package => "package",
            Domain::Cores => "core",
            Domain::Uncore => "uncore",
            Domain::Dram => "dram",
        }
    }

    /// Classify a powercap zone name (`package-0`, `core`, `uncore`, `dram`).
    pub fn from_zone_name(name: &str) -> Option<Domain> {
        Domain::ALL
            .into_iter()
            .find(|domain| name.starts_with(domain.zone_prefix()))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Package => "package",
            Domain::Cores => "cores",
            Domain::Uncore => "uncore",
            Domain::Dram => "dram",
        };
        f.write_str(name)
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "package" | "pkg" => Ok(Domain::Package),
            "cores" | "core" | "pp0" => Ok(Domain::Cores),
            "uncore" | "pp1" => Ok(Domain::Uncore),
            "dram" => Ok(Domain::Dram),
            other => Err(format!(
                "unknown domain '{other}' (expected package, cores, uncore or dram)"
            )),
        }
    }
}

/// Identifies one physically addressable counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Attributes {
    pub domain: Domain,
    pub socket: u32,
}

impl Attributes {
    pub const fn new(domain: Domain, socket: u32) -> Self {
        Self { domain, socket }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new(Domain::Package, 0)
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (socket {})", self.domain, self.socket)
    }
}

/// Energy in microjoules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Microjoules(pub u64);

impl Microjoules {
    pub const ZERO: Microjoules = Microjoules(0);

    /// Convert whole joules; `None` if the result does not fit in 64 bits.
    pub fn from_joules(joules: u64) -> Option<Self> {
        joules.checked_mul(1_000_000).map(Microjoules)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub fn as_joules_f64(self) -> f64 {
        self.0 as f64 / 1e6
    }
}

impl fmt::Display for Microjoules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} uJ", self.0)
    }
}

/// A point in time, in nanoseconds since the epoch of a [`ClockSource`](crate::ClockSource).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Convert whole seconds; `None` if the result does not fit in 64 bits.
    pub fn from_secs(secs: i64) -> Option<Self> {
        secs.checked_mul(1_000_000_000).map(Self)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Signed nanoseconds from `earlier` to `self`, saturating at the i64 range.
    pub fn nanos_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// One sample of an energy counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reading {
    pub timestamp: Timestamp,
    pub energy: Microjoules,
}

impl Reading {
    pub const fn new(timestamp: Timestamp, energy: Microjoules) -> Self {
        Self { timestamp, energy }
    }
}

/// Energy consumed between two readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Difference {
    /// Signed elapsed time in nanoseconds.
    pub duration_ns: i64,
    pub energy_consumed: Microjoules,
}

impl Difference {
    pub const fn new(duration_ns: i64, energy_consumed: Microjoules) -> Self {
        Self {
            duration_ns,
            energy_consumed,
        }
    }

    /// Elapsed time, or `None` when the readings were passed newest-last.
    pub fn duration(&self) -> Option<std::time::Duration> {
        u64::try_from(self.duration_ns)
            .ok()
            .map(std::time::Duration::from_nanos)
    }

    /// Average power over the interval in watts (uJ/ns = 1e3 W).
    pub fn average_watts(&self) -> Option<f64> {
        if self.duration_ns <= 0 {
            return None;
        }
        Some(self.energy_consumed.0 as f64 / self.duration_ns as f64 * 1e3)
    }
}
