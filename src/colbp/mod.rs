//! ColBP — Collaborative Build-and-Probe (§4.5).
//!
//! Four model variants sharing a common shape (build R into a table, probe
//! S against it, accumulate `(matches, checksum)`) but differing in how
//! many tables exist, where they live, and how build/probe work rotates
//! across LLC groups. [`dispatch`] runs whichever model [`RadixPlan::model`]
//! selected after ICP.

mod model1;
mod model2;
mod model3;
mod model4;

use crate::context::JoinContext;
use crate::error::Result;
use crate::hashtable::HashTable;
use crate::icp::{Cursors, PosCell};
use crate::plan::Model;
use crate::relation::Tuple;
use std::sync::OnceLock;

/// The shared hash table storage every model draws from. Model I and III
/// use `single`; Model II uses one slot of `per_group` per LLC group.
/// Each slot is a [`OnceLock`] so a designated leader thread can allocate
/// it lazily and every other thread can wait on the same value, rather
/// than every model having to invent its own allocate-and-barrier dance.
pub struct Tables {
    single: OnceLock<HashTable>,
    per_group: Vec<OnceLock<HashTable>>,
}

impl Tables {
    pub fn new(num_groups: usize) -> Self {
        Tables { single: OnceLock::new(), per_group: (0..num_groups).map(|_| OnceLock::new()).collect() }
    }
}

fn partition_of(key: u32, shift: usize, mask: u32) -> usize {
    ((key >> shift) & mask) as usize
}

/// Number of threads whose `tid % num_groups == g` (§4.1's round-robin
/// placement guarantees `group == tid % num_groups`, so this is also the
/// number of threads in group `g`).
fn group_size(num_threads: usize, num_groups: usize, g: usize) -> usize {
    (num_threads - g).div_ceil(num_groups)
}

/// This thread's index within its own group (0-based), consistent with
/// [`group_size`]: threads `g, g + num_groups, g + 2*num_groups, ...` are
/// group `g`'s members in rotation order.
fn position_in_group(tid: usize, num_groups: usize) -> usize {
    tid / num_groups
}

/// Per-thread, per-LLC-group share of a table's `[0, len)` range, used for
/// NUMA first-touch zeroing (§3 Lifecycles, §4.5 build steps).
fn numa_zero_share(table: &HashTable, tid: usize, num_groups: usize, num_threads: usize) {
    let group = tid % num_groups;
    let gs = group_size(num_threads, num_groups, group);
    let pos = position_in_group(tid, num_groups);
    let (start, count) = crate::placement::sub_relation_span(table.len(), gs, pos);
    table.zero_range(start, start + count);
}

/// Consume the contiguous run of tuples at the front of `(block, sub_block)`
/// whose partition equals `p`, calling `f` on each and advancing the
/// cursor. ICP leaves each sub-block radix-sorted by exact partition, so a
/// single forward scan per call is enough; the cursor left behind is
/// exactly where the next iteration's run for `p + 1` begins.
fn drain_partition_run<F: FnMut(&Tuple)>(
    tuples: &[Tuple],
    pos: &[Vec<PosCell>],
    cursors: &mut Cursors,
    shift: usize,
    mask: u32,
    sub_block: usize,
    partition: usize,
    mut f: F,
) {
    for (block, row) in pos.iter().enumerate() {
        let end = row[sub_block].end;
        loop {
            let at = cursors.get(block, sub_block);
            if at >= end {
                break;
            }
            let t = &tuples[at];
            if partition_of(t.key, shift, mask) != partition {
                break;
            }
            f(t);
            cursors.advance(block, sub_block, 1);
        }
    }
}

/// Inputs common to every model: each side's tuples plus its ICP position
/// matrix (Cursors are built internally, one per side, since only this
/// thread ever touches its own).
pub struct ColbpInput<'a> {
    pub sub_r: &'a [Tuple],
    pub sub_s: &'a [Tuple],
    pub r_pos: &'a [Vec<PosCell>],
    pub s_pos: &'a [Vec<PosCell>],
    pub r_len: usize,
    /// The shift ICP(R) used to produce `r_pos` (0 for Models I/II, the
    /// high-bit shift from [`crate::icp::model_iii_shift`] for Model III).
    pub r_shift: usize,
}

/// Run whichever model `ctx.plan` currently selects, returning this
/// thread's local `(matches, checksum)` accumulators.
pub fn dispatch(ctx: &JoinContext, tid: usize, input: &ColbpInput) -> Result<(u64, u64)> {
    match ctx.plan.model()? {
        Model::I => Ok(model1::run(ctx, tid, input)),
        Model::II => Ok(model2::run(ctx, tid, input)),
        Model::III => Ok(model3::run(ctx, tid, input)),
        Model::IV => model4::run(ctx, tid, input),
    }
}
