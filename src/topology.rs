//! Hardware topology discovery.
//!
//! Per the §9 design note, the LLC → core → hardware-thread hierarchy is a
//! tree with back-edges (a core belongs to exactly one LLC; a hardware
//! thread belongs to exactly one core). We represent it as flat parallel
//! arrays indexed by id rather than as an owned tree of pointers, which
//! gives O(1) navigation without ownership cycles.
//!
//! Discovery reads `/sys/devices/system/cpu` on Linux (cache index 3,
//! i.e. the LLC, and `core_id`/`package_id` topology files) and falls back
//! to a single-LLC, single-hardware-thread-per-core model derived from
//! [`num_cpus`] on platforms where that sysfs tree isn't available.

use crate::error::{JoinError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Discovered machine topology, consumed by [`crate::placement`].
#[derive(Debug, Clone)]
pub struct Topology {
    /// Number of last-level caches (LLC groups) on the machine.
    pub num_llcs: usize,
    /// Physical cores sharing a single LLC.
    pub cores_per_llc: usize,
    /// Hardware threads (SMT siblings) per physical core.
    pub cpus_per_core: usize,
    /// Last-level cache size in bytes.
    pub llc_size: usize,
    /// Cache line size in bytes.
    pub line_size: usize,
    /// OS CPU id for each logical hardware thread, indexed `[llc][core][cpu]`
    /// flattened in placement order. `cpu_ids[i]` is the OS id to pin to for
    /// the `i`-th hardware thread as enumerated by [`Topology::hw_threads`].
    cpu_ids: Vec<usize>,
}

impl Topology {
    /// Total hardware threads on the machine.
    pub fn num_hw_threads(&self) -> usize {
        self.num_llcs * self.cores_per_llc * self.cpus_per_core
    }

    /// Total physical cores on the machine.
    pub fn num_cores(&self) -> usize {
        self.num_llcs * self.cores_per_llc
    }

    /// OS CPU id for the `i`-th hardware thread in placement order
    /// (LLC-major, then core, then SMT sibling).
    pub fn os_cpu_id(&self, i: usize) -> usize {
        self.cpu_ids[i]
    }

    /// Discover the topology of the machine this process is running on.
    pub fn discover() -> Result<Topology> {
        linux_sysfs_topology("/sys/devices/system/cpu").or_else(|_| Ok(fallback_topology()))
    }

    /// Build a topology directly from known parameters, bypassing discovery.
    /// Used by tests and by callers that already know the shape of their
    /// target machine (e.g. benchmark harnesses pinned to a cgroup).
    pub fn from_parts(
        num_llcs: usize,
        cores_per_llc: usize,
        cpus_per_core: usize,
        llc_size: usize,
        line_size: usize,
    ) -> Topology {
        let total = num_llcs * cores_per_llc * cpus_per_core;
        Topology {
            num_llcs,
            cores_per_llc,
            cpus_per_core,
            llc_size,
            line_size,
            cpu_ids: (0..total).collect(),
        }
    }
}

/// A single logical CPU as read from sysfs: which package (LLC proxy) and
/// core it belongs to.
struct RawCpu {
    os_id: usize,
    package_id: usize,
    core_id: usize,
}

fn linux_sysfs_topology(root: &str) -> Result<Topology> {
    let root = Path::new(root);
    if !root.is_dir() {
        return Err(JoinError::AllocationFailure {
            detail: format!("{} not present", root.display()),
        });
    }

    let mut raw = Vec::new();
    for entry in fs::read_dir(root)
        .map_err(|e| JoinError::AllocationFailure { detail: e.to_string() })?
    {
        let entry = entry.map_err(|e| JoinError::AllocationFailure { detail: e.to_string() })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(rest) = name.strip_prefix("cpu") else { continue };
        let Ok(os_id) = rest.parse::<usize>() else { continue };

        let topo_dir = entry.path().join("topology");
        let package_id = read_usize(&topo_dir.join("physical_package_id")).unwrap_or(0);
        let core_id = read_usize(&topo_dir.join("core_id")).unwrap_or(os_id);
        raw.push(RawCpu { os_id, package_id, core_id });
    }

    if raw.is_empty() {
        return Err(JoinError::AllocationFailure { detail: "no cpuN entries found".into() });
    }

    // Group logical CPUs by (package, core) to discover SMT siblings, then
    // by package to discover cores-per-LLC. We treat one package as one LLC
    // group, which holds on every mainstream single-socket-per-LLC layout
    // this engine targets.
    let mut by_package: BTreeMap<usize, BTreeMap<usize, Vec<usize>>> = BTreeMap::new();
    for cpu in &raw {
        by_package
            .entry(cpu.package_id)
            .or_default()
            .entry(cpu.core_id)
            .or_default()
            .push(cpu.os_id);
    }

    let num_llcs = by_package.len();
    let cores_per_llc = by_package.values().map(|cores| cores.len()).min().unwrap_or(1);
    let cpus_per_core = by_package
        .values()
        .flat_map(|cores| cores.values().map(|v| v.len()))
        .min()
        .unwrap_or(1);

    let mut cpu_ids = Vec::with_capacity(raw.len());
    for cores in by_package.values() {
        for siblings in cores.values() {
            for &id in siblings.iter().take(cpus_per_core) {
                cpu_ids.push(id);
            }
        }
    }

    let llc_size = read_cache_size(root).unwrap_or(8 * 1024 * 1024);
    let line_size = read_line_size(root).unwrap_or(64);

    Ok(Topology {
        num_llcs,
        cores_per_llc,
        cpus_per_core,
        llc_size,
        line_size,
        cpu_ids,
    })
}

fn read_usize(path: &Path) -> Option<usize> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn read_cache_size(cpu_root: &Path) -> Option<usize> {
    let cache_dir = cpu_root.join("cpu0/cache");
    for i in (0..=4).rev() {
        let level_dir = cache_dir.join(format!("index{i}"));
        let level = read_usize(&level_dir.join("level"))?;
        let kind = fs::read_to_string(level_dir.join("type")).ok()?;
        let is_llc = level >= 3 || kind.trim() == "Unified";
        if !is_llc {
            continue;
        }
        let size_str = fs::read_to_string(level_dir.join("size")).ok()?;
        let digits: String = size_str.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(kib) = digits.parse::<usize>() {
            return Some(kib * 1024);
        }
    }
    None
}

fn read_line_size(cpu_root: &Path) -> Option<usize> {
    let cache_dir = cpu_root.join("cpu0/cache/index3");
    read_usize(&cache_dir.join("coherency_line_size"))
}

fn fallback_topology() -> Topology {
    let total = num_cpus::get().max(1);
    Topology {
        num_llcs: 1,
        cores_per_llc: total,
        cpus_per_core: 1,
        llc_size: 8 * 1024 * 1024,
        line_size: 64,
        cpu_ids: (0..total).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_enumerates_all_hw_threads() {
        let topo = Topology::from_parts(2, 4, 2, 8 * 1024 * 1024, 64);
        assert_eq!(topo.num_hw_threads(), 16);
        assert_eq!(topo.num_cores(), 8);
        for i in 0..16 {
            assert_eq!(topo.os_cpu_id(i), i);
        }
    }

    #[test]
    fn fallback_never_panics() {
        let topo = fallback_topology();
        assert!(topo.num_hw_threads() >= 1);
    }
}
