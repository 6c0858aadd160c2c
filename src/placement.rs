//! Thread/CPU placement (§4.1).
//!
//! Maps a requested thread count `N` onto the discovered [`Topology`],
//! producing one [`ThreadSlot`] per worker: the OS CPU id to pin to and the
//! LLC `group` the thread belongs to. The deal is round-robin across
//! utilized LLCs, filling cores within an LLC before moving to the next,
//! and filling hardware threads within a core up to `utilized_cpus_per_core`
//! before advancing — which guarantees the invariant ColBP relies on:
//! `tid mod num_groups == group`.

use crate::error::{JoinError, Result};
use crate::topology::Topology;

/// Placement of a single worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSlot {
    /// OS CPU id to pin this thread to.
    pub os_cpu_id: usize,
    /// LLC group this thread belongs to (`tid % num_groups`).
    pub group: usize,
}

/// Full placement for an `N`-thread run.
#[derive(Debug, Clone)]
pub struct Placement {
    pub slots: Vec<ThreadSlot>,
    pub num_groups: usize,
}

/// Compute placement for `n` worker threads on `topo`.
///
/// `favor_physical_cores` corresponds to `--favor_hyperthreading`'s
/// negation: when set and the machine has at least `n` physical cores,
/// placement uses one hardware thread per core instead of packing SMT
/// siblings first.
pub fn place(topo: &Topology, n: usize, favor_physical_cores: bool) -> Result<Placement> {
    if n == 0 {
        return Err(JoinError::InvalidArgument("thread count must be > 0".into()));
    }

    let use_physical_only = favor_physical_cores && topo.num_cores() >= n;
    let cpus_per_llc_effective = if use_physical_only {
        topo.cores_per_llc
    } else {
        topo.cores_per_llc * topo.cpus_per_core
    };

    let utilized_llcs = n.div_ceil(cpus_per_llc_effective);
    if utilized_llcs > topo.num_llcs {
        return Err(JoinError::TopologyMismatch {
            requested: n,
            available: topo.num_hw_threads(),
            utilized_llcs,
            num_llcs: topo.num_llcs,
        });
    }

    let utilized_cpus_per_core = n.div_ceil(utilized_llcs * topo.cores_per_llc);
    let num_groups = utilized_llcs;

    // Deal round-robin across utilized LLCs: fill cores within an LLC,
    // then hw-threads within a core up to utilized_cpus_per_core, before
    // advancing to the next LLC.
    let mut per_llc_cursor = vec![0usize; utilized_llcs];
    let mut slots = Vec::with_capacity(n);
    let mut t = 0usize;
    'outer: loop {
        for llc in 0..utilized_llcs {
            if t >= n {
                break 'outer;
            }
            let cursor = per_llc_cursor[llc];
            let max_cursor = topo.cores_per_llc * utilized_cpus_per_core;
            if cursor >= max_cursor {
                continue;
            }
            let core_in_llc = cursor / utilized_cpus_per_core;
            let cpu_in_core = cursor % utilized_cpus_per_core;
            let hw_thread_index =
                llc * topo.cores_per_llc * topo.cpus_per_core + core_in_llc * topo.cpus_per_core + cpu_in_core;
            let os_cpu_id = topo.os_cpu_id(hw_thread_index);

            // group = t mod num_groups, guaranteed by this round-robin deal.
            slots.push(ThreadSlot { os_cpu_id, group: t % num_groups });
            per_llc_cursor[llc] += 1;
            t += 1;
        }
    }

    debug_assert!(slots.iter().enumerate().all(|(t, s)| s.group == t % num_groups));

    Ok(Placement { slots, num_groups })
}

/// Split `len` elements across `n` threads as evenly as possible: each
/// thread gets `len / n` elements plus one extra if its index is below
/// `len % n`. Returns the `(offset, count)` pair for thread `t`.
pub fn sub_relation_span(len: usize, n: usize, t: usize) -> (usize, usize) {
    let base = len / n;
    let remainder = len % n;
    let extra_before = t.min(remainder);
    let offset = t * base + extra_before;
    let count = base + usize::from(t < remainder);
    (offset, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_invariant_holds_for_various_shapes() {
        for (llcs, cores, cpus, n) in
            [(2, 4, 2, 16), (2, 4, 2, 5), (1, 8, 1, 8), (4, 2, 2, 3), (1, 64, 1, 64)]
        {
            let topo = Topology::from_parts(llcs, cores, cpus, 8 * 1024 * 1024, 64);
            let placement = place(&topo, n, false).unwrap();
            assert_eq!(placement.slots.len(), n);
            for (t, slot) in placement.slots.iter().enumerate() {
                assert_eq!(slot.group, t % placement.num_groups);
            }
        }
    }

    #[test]
    fn rejects_more_llcs_than_available() {
        let topo = Topology::from_parts(1, 2, 1, 8 * 1024 * 1024, 64);
        assert!(place(&topo, 100, false).is_err());
    }

    #[test]
    fn favor_physical_cores_uses_one_thread_per_core() {
        let topo = Topology::from_parts(1, 8, 2, 8 * 1024 * 1024, 64);
        let placement = place(&topo, 8, true).unwrap();
        assert_eq!(placement.num_groups, 1);
        assert_eq!(placement.slots.len(), 8);
    }

    #[test]
    fn sub_relation_span_covers_exactly_len_with_remainder_on_early_threads() {
        let len = 103;
        let n = 8;
        let mut total = 0;
        for t in 0..n {
            let (offset, count) = sub_relation_span(len, n, t);
            assert_eq!(offset, total);
            total += count;
        }
        assert_eq!(total, len);
    }
}
