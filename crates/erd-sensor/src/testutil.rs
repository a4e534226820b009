//! Synthetic powercap/topology trees for tests.

use std::path::{Path, PathBuf};

use crate::resolver::SensorRoots;

pub(crate) struct FakeSysfs {
    root: PathBuf,
}

impl FakeSysfs {
    pub(crate) fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "erd-sysfs-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(root.join("cpu")).unwrap();
        std::fs::create_dir_all(root.join("intel-rapl")).unwrap();
        Self { root }
    }

    pub(crate) fn roots(&self) -> SensorRoots {
        SensorRoots {
            powercap: self.root.join("intel-rapl"),
            cpu: self.root.join("cpu"),
        }
    }

    /// One CPU per entry, carrying the given physical package id.
    pub(crate) fn with_cpus(self, package_ids: &[u32]) -> Self {
        for (cpu, id) in package_ids.iter().enumerate() {
            let dir = self.root.join(format!("cpu/cpu{cpu}/topology"));
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("physical_package_id"), format!("{id}\n")).unwrap();
        }
        self
    }

    /// Top-level zone `intel-rapl:<index>`.
    pub(crate) fn with_zone(self, index: u32, name: &str, energy: u64, max: u64) -> Self {
        let dir = self.zone_path(index);
        write_zone(&dir, name, energy, max);
        self
    }

    /// Sub-zone `intel-rapl:<index>:<sub>`.
    pub(crate) fn with_subzone(self, index: u32, sub: u32, name: &str, energy: u64, max: u64) -> Self {
        let dir = self.subzone_path(index, sub);
        write_zone(&dir, name, energy, max);
        self
    }

    pub(crate) fn zone_path(&self, index: u32) -> PathBuf {
        self.root.join(format!("intel-rapl/intel-rapl:{index}"))
    }

    pub(crate) fn subzone_path(&self, index: u32, sub: u32) -> PathBuf {
        self.zone_path(index)
            .join(format!("intel-rapl:{index}:{sub}"))
    }

    pub(crate) fn set_energy(&self, zone: &Path, energy: u64) {
        std::fs::write(zone.join("energy_uj"), format!("{energy}\n")).unwrap();
    }
}

fn write_zone(dir: &Path, name: &str, energy: u64, max: u64) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("name"), format!("{name}\n")).unwrap();
    std::fs::write(dir.join("energy_uj"), format!("{energy}\n")).unwrap();
    std::fs::write(dir.join("max_energy_range_uj"), format!("{max}\n")).unwrap();
}

impl Drop for FakeSysfs {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
