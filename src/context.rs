//! `JoinContext`: the consolidated replacement for the three globals the
//! §9 design note calls out (`Threads`, `Radix`, `SysInfo`). Built once by
//! the driver and shared by reference with every worker thread.

use crate::barrier::{Barrier, StagedBarrier};
use crate::colbp::Tables;
use crate::error::{JoinError, Result};
use crate::placement::{self, Placement};
use crate::plan::RadixPlan;
use crate::topology::Topology;
use std::sync::atomic::Ordering;

/// Which payload semantics the probe phase uses (§6 "Outputs").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// Every probed tuple counts as a match; the checksum sums whatever
    /// payload the table holds for that key.
    #[default]
    Default,
    /// Payload is the probed key itself; a probe only counts as a match
    /// when the retrieved payload equals the probed key, which doubles as
    /// a correctness check on the hash table build rather than an
    /// unconditional count.
    Test,
}

/// Everything workers need that isn't private per-thread state: the
/// topology and placement the driver discovered, the mutable radix plan,
/// the two barrier flavors every phase rendezvouses on, and the lazily
/// allocated hash table storage ColBP builds into.
pub struct JoinContext {
    pub topology: Topology,
    pub placement: Placement,
    pub plan: RadixPlan,
    pub barrier: Barrier,
    pub staged: StagedBarrier,
    pub skew_zipf: f64,
    pub tables: Tables,
    pub payload_mode: PayloadMode,
}

impl JoinContext {
    pub fn num_threads(&self) -> usize {
        self.placement.slots.len()
    }

    pub fn num_groups(&self) -> usize {
        self.placement.num_groups
    }

    pub fn group_of(&self, tid: usize) -> usize {
        self.placement.slots[tid].group
    }

    /// Build a context for an `n`-thread run, auto-selecting the initial
    /// radix plan from `r_len` and the discovered LLC size (§4.4).
    pub fn build(
        topology: Topology,
        n: usize,
        favor_physical_cores: bool,
        r_len: usize,
        skew_zipf: f64,
        user_plan: Option<(usize, usize)>,
    ) -> Result<JoinContext> {
        let placement = placement::place(&topology, n, favor_physical_cores)?;
        let plan = match user_plan {
            Some((r_bits, s_bits)) => RadixPlan::user_defined(r_bits, s_bits, placement.num_groups)?,
            None => RadixPlan::select(r_len, topology.llc_size, placement.num_groups)?,
        };
        let num_groups = placement.num_groups;
        Ok(JoinContext {
            topology,
            placement,
            plan,
            barrier: Barrier::new(n),
            staged: StagedBarrier::new(n),
            skew_zipf,
            tables: Tables::new(num_groups),
            payload_mode: PayloadMode::Default,
        })
    }

    /// Select the payload mode (§6 "Outputs"); defaults to [`PayloadMode::Default`].
    pub fn with_payload_mode(mut self, mode: PayloadMode) -> Self {
        self.payload_mode = mode;
        self
    }

    /// Thread 0's half of the unanimous skew rewrite (§4.3.1): demote to
    /// Model III (`S_bits <- 0`, `R_bits <- R_bits + 1`) and latch
    /// `ChangedRadixS`. Every other thread just observes the flag after
    /// the staged barrier that follows this call.
    pub fn rewrite_plan_to_model_iii(&self) {
        let new_r_bits = self.plan.r_bits() + 1;
        self.plan.r_bits.store(new_r_bits, Ordering::Release);
        self.plan.s_bits.store(0, Ordering::Release);
        self.plan.changed_radix_s.store(true, Ordering::Release);
        eprintln!(
            "colbp-join: unanimous skew on S detected; rewriting plan to Model III (R_bits={new_r_bits}, S_bits=0)"
        );
    }

    pub fn plan_was_rewritten(&self) -> bool {
        self.plan.changed_radix_s.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_picks_model_i_for_a_small_relation() {
        let topo = Topology::from_parts(1, 4, 1, 8 * 1024 * 1024, 64);
        let ctx = JoinContext::build(topo, 4, false, 1000, 0.0, None).unwrap();
        assert_eq!(ctx.plan.r_bits(), 0);
        assert_eq!(ctx.num_threads(), 4);
    }

    #[test]
    fn build_honors_a_user_defined_plan() {
        let topo = Topology::from_parts(1, 4, 1, 8 * 1024 * 1024, 64);
        let ctx = JoinContext::build(topo, 4, false, 1_000_000, 1.2, Some((2, 2))).unwrap();
        assert_eq!(ctx.plan.r_bits(), 2);
        assert!(ctx.plan.user_defined);
    }

    #[test]
    fn rewrite_latches_the_changed_flag_and_demotes_s() {
        let topo = Topology::from_parts(1, 4, 1, 8 * 1024 * 1024, 64);
        let ctx = JoinContext::build(topo, 4, false, 1_000_000, 1.2, Some((2, 2))).unwrap();
        ctx.rewrite_plan_to_model_iii();
        assert_eq!(ctx.plan.s_bits(), 0);
        assert_eq!(ctx.plan.r_bits(), 3);
        assert!(ctx.plan_was_rewritten());
    }
}
