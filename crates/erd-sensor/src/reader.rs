use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::clock::ClockSource;
use crate::error::{Result, SensorError};
use crate::nop::NopReader;
use crate::resolver::{resolve_sensor, ResolvedSensor, SensorRoots};
use crate::sysfs;
use crate::types::{Attributes, Difference, Microjoules, Reading};

/// The operations every energy backend provides.
pub trait EnergyReader {
    /// Sample the counter now.
    fn obtain_readings(&self) -> Result<Reading>;

    /// Energy and time elapsed from `rhs` to `lhs`.
    ///
    /// `lhs` must be the later sample. Only numeric counter wraparound is
    /// corrected; swapped arguments are not detected here.
    fn subtract(&self, lhs: &Reading, rhs: &Reading) -> Difference;

    fn attributes(&self) -> Attributes;
}

/// Counter difference with wraparound correction.
///
/// When `rhs > lhs` the counter passed `max` between the samples, so the
/// consumption is `(max - rhs) + lhs`.
pub fn subtract_energy(lhs: Microjoules, rhs: Microjoules, max: Microjoules) -> Microjoules {
    if rhs > lhs {
        Microjoules(max.0.wrapping_sub(rhs.0).wrapping_add(lhs.0))
    } else {
        Microjoules(lhs.0 - rhs.0)
    }
}

/// Reader backed by a powercap `energy_uj` file.
pub struct PowercapReader {
    attrs: Attributes,
    sensor: File,
    sensor_path: PathBuf,
    max_energy: Microjoules,
    clock: ClockSource,
}

impl PowercapReader {
    /// Resolve `attrs` under `config.roots` and open the counter.
    pub fn open(attrs: Attributes, config: &ReaderConfig) -> Result<Self> {
        let resolved = resolve_sensor(attrs, &config.roots)?;
        Self::from_resolved(attrs, resolved, config.clock)
    }

    /// Open the counter of an already resolved zone.
    pub fn from_resolved(
        attrs: Attributes,
        resolved: ResolvedSensor,
        clock: ClockSource,
    ) -> Result<Self> {
        let sensor_path = resolved.energy_path();
        let sensor =
            File::open(&sensor_path).map_err(|err| SensorError::io(sensor_path.clone(), err))?;
        debug!(path = ?sensor_path, max = resolved.max_energy.0, "opened energy counter");
        Ok(Self {
            attrs,
            sensor,
            sensor_path,
            max_energy: resolved.max_energy,
            clock,
        })
    }

    /// Wraparound ceiling read from `max_energy_range_uj`.
    pub fn max_energy(&self) -> Microjoules {
        self.max_energy
    }

    pub fn sensor_path(&self) -> &Path {
        &self.sensor_path
    }
}

impl EnergyReader for PowercapReader {
    fn obtain_readings(&self) -> Result<Reading> {
        let energy = sysfs::read_u64_at(&self.sensor, &self.sensor_path)?;
        Ok(Reading::new(self.clock.now(), Microjoules(energy)))
    }

    fn subtract(&self, lhs: &Reading, rhs: &Reading) -> Difference {
        Difference::new(
            lhs.timestamp.nanos_since(rhs.timestamp),
            subtract_energy(lhs.energy, rhs.energy, self.max_energy),
        )
    }

    fn attributes(&self) -> Attributes {
        self.attrs
    }
}

impl fmt::Debug for PowercapReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowercapReader")
            .field("attrs", &self.attrs)
            .field("sensor_path", &self.sensor_path)
            .field("max_energy", &self.max_energy)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Which backend a [`Reader`] uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// Real counters from the powercap sysfs interface.
    #[default]
    Powercap,
    /// Zero energy; for hosts without RAPL.
    Nop,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Powercap => f.write_str("powercap"),
            Backend::Nop => f.write_str("nop"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "powercap" | "rapl" => Ok(Backend::Powercap),
            "nop" | "none" => Ok(Backend::Nop),
            other => Err(format!(
                "unknown backend '{other}' (expected powercap or nop)"
            )),
        }
    }
}

/// Where and how a [`Reader`] finds and stamps its counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderConfig {
    pub backend: Backend,
    pub roots: SensorRoots,
    pub clock: ClockSource,
}

/// An energy reader with its backend chosen at construction.
#[derive(Debug)]
pub enum Reader {
    Powercap(PowercapReader),
    Nop(NopReader),
}

impl Reader {
    pub fn new(attrs: Attributes, config: &ReaderConfig) -> Result<Self> {
        match config.backend {
            Backend::Powercap => PowercapReader::open(attrs, config).map(Reader::Powercap),
            Backend::Nop => Ok(Reader::Nop(NopReader::new(attrs, config.clock))),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Reader::Powercap(_) => Backend::Powercap,
            Reader::Nop(_) => Backend::Nop,
        }
    }
}

impl EnergyReader for Reader {
    fn obtain_readings(&self) -> Result<Reading> {
        match self {
            Reader::Powercap(reader) => reader.obtain_readings(),
            Reader::Nop(reader) => reader.obtain_readings(),
        }
    }

    fn subtract(&self, lhs: &Reading, rhs: &Reading) -> Difference {
        match self {
            Reader::Powercap(reader) => reader.subtract(lhs, rhs),
            Reader::Nop(reader) => reader.subtract(lhs, rhs),
        }
    }

    fn attributes(&self) -> Attributes {
        match self {
            Reader::Powercap(reader) => reader.attributes(),
            Reader::Nop(reader) => reader.attributes(),
        }
    }
}
