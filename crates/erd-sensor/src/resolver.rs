//! Map (domain, socket) to a powercap zone directory.
//!
//! See <https://www.kernel.org/doc/html/latest/power/powercap/powercap.html>
//! for the layout. Zone counts differ between machines, so every candidate is
//! probed for existence instead of assuming fixed paths.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SensorError};
use crate::sysfs;
use crate::topology::count_sockets;
use crate::types::{Attributes, Domain, Microjoules};

const POWERCAP_RAPL_PATH: &str = "/sys/class/powercap/intel-rapl";
const CPU_TOPOLOGY_PATH: &str = "/sys/devices/system/cpu";
const POWER_ZONE_PREFIX: &str = "intel-rapl";
const PACKAGE_NAME_PREFIX: &str = "package-";

/// Sub-zones probed under each package: core, uncore and dram.
pub const MAX_SUBZONES: u32 = 3;

/// Filesystem roots the resolver walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRoots {
    /// Powercap control type directory, holding `intel-rapl:<n>` zones.
    pub powercap: PathBuf,
    /// CPU directory, holding `cpu<n>/topology/physical_package_id`.
    pub cpu: PathBuf,
}

impl Default for SensorRoots {
    fn default() -> Self {
        Self {
            powercap: PathBuf::from(POWERCAP_RAPL_PATH),
            cpu: PathBuf::from(CPU_TOPOLOGY_PATH),
        }
    }
}

/// A resolved zone and its wraparound ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSensor {
    pub path: PathBuf,
    pub max_energy: Microjoules,
}

impl ResolvedSensor {
    pub fn energy_path(&self) -> PathBuf {
        self.path.join("energy_uj")
    }
}

/// Resolve `attrs` to a zone directory and read its `max_energy_range_uj`.
pub fn resolve_sensor(attrs: Attributes, roots: &SensorRoots) -> Result<ResolvedSensor> {
    let path = resolve(attrs, roots)?;
    let max_energy = Microjoules(sysfs::read_u64(&path.join("max_energy_range_uj"))?);
    Ok(ResolvedSensor { path, max_energy })
}

/// Resolve `attrs` to the zone directory holding its counter.
pub fn resolve(attrs: Attributes, roots: &SensorRoots) -> Result<PathBuf> {
    let num_sockets = count_sockets(&roots.cpu)?;
    if attrs.socket >= num_sockets {
        return Err(SensorError::SocketOutOfRange {
            requested: attrs.socket,
            available: num_sockets,
        });
    }

    for skt in 0..num_sockets {
        let zone = roots.powercap.join(format!("{POWER_ZONE_PREFIX}:{skt}"));
        if !zone.exists() {
            continue;
        }
        let package = package_number(&zone)?;
        if package != attrs.socket {
            continue;
        }

        if attrs.domain == Domain::Package {
            info!(path = ?zone, socket = package, "found package domain");
            return Ok(zone);
        }

        return find_subzone(&zone, skt, attrs);
    }

    Err(SensorError::SocketNotFound(attrs.socket))
}

fn find_subzone(zone: &Path, skt: u32, attrs: Attributes) -> Result<PathBuf> {
    for sub in 0..MAX_SUBZONES {
        let path = zone.join(format!("{POWER_ZONE_PREFIX}:{skt}:{sub}"));
        if !path.exists() {
            continue;
        }
        let name = sysfs::read_name(&path.join("name"))?;
        let domain =
            Domain::from_zone_name(&name).ok_or(SensorError::UnknownDomainName(name))?;
        debug!(?path, %domain, "probed sub-zone");
        if domain == attrs.domain {
            info!(?path, socket = attrs.socket, %domain, "found domain");
            return Ok(path);
        }
    }

    Err(SensorError::DomainNotFound {
        domain: attrs.domain,
        socket: attrs.socket,
    })
}

/// Read `<zone>/name` and extract `<n>` from `package-<n>`.
fn package_number(zone: &Path) -> Result<u32> {
    let name = sysfs::read_name(&zone.join("name"))?;
    if !name.starts_with(Domain::Package.zone_prefix()) {
        return Err(SensorError::NotAPackage {
            path: zone.to_path_buf(),
            name,
        });
    }
    name.strip_prefix(PACKAGE_NAME_PREFIX)
        .and_then(|number| number.parse().ok())
        .ok_or(SensorError::BadPackageNumber(name))
}
