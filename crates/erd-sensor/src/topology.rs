use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::sysfs;

/// Count distinct physical packages listed under `cpu_root`.
///
/// Walks `cpu<i>/topology/physical_package_id` for `i = 0..` and stops at the
/// first CPU without one.
pub fn count_sockets(cpu_root: &Path) -> Result<u32> {
    let mut packages = BTreeSet::new();
    for cpu in 0u32.. {
        let path = cpu_root
            .join(format!("cpu{cpu}"))
            .join("topology")
            .join("physical_package_id");
        if !path.exists() {
            break;
        }
        packages.insert(sysfs::read_u64(&path)?);
    }
    debug!(sockets = packages.len(), ?cpu_root, "counted physical packages");
    Ok(packages.len() as u32)
}
