//! Model III (§4.5.3): S unpartitioned, one `|R|+1`-sized table indexed by
//! the raw key. ICP(R) shifted on R's high bits, so each R-partition's keys
//! already form a contiguous range of the table — NUMA locality falls out
//! of the shift, not of separate per-group allocations.

use super::{drain_partition_run, numa_zero_share, ColbpInput};
use crate::context::{JoinContext, PayloadMode};
use crate::hashtable::HashTable;
use crate::icp::Cursors;

pub fn run(ctx: &JoinContext, tid: usize, input: &ColbpInput) -> (u64, u64) {
    let table = ctx.tables.single.get_or_init(|| HashTable::allocate(input.r_len + 1));
    numa_zero_share(table, tid, 1, ctx.num_threads());
    ctx.barrier.wait();

    let num_groups = ctx.num_groups();
    let group = ctx.group_of(tid);
    let r_bits = ctx.plan.r_bits();
    let fanout_r = 1usize << r_bits;
    let iters = fanout_r / num_groups;
    let mask = (fanout_r - 1) as u32;

    let mut checksum = 0u64;
    let mut r_cursors = Cursors::new(input.r_pos);
    let mut step = 0usize;
    for i in 0..iters {
        for g in 0..num_groups {
            let h = (g + group) % num_groups;
            let p = h * iters + i;
            drain_partition_run(input.sub_r, input.r_pos, &mut r_cursors, input.r_shift, mask, h, p, |t| {
                table.set(t.key as usize, t.payload);
                checksum += t.key as u64;
            });
            ctx.staged.wait(step);
            step += 1;
        }
    }
    ctx.barrier.wait();

    let mut matches = 0u64;
    for t in input.sub_s {
        let got = table.get(t.key as usize);
        checksum += got as u64;
        match ctx.payload_mode {
            PayloadMode::Default => matches += 1,
            PayloadMode::Test => {
                if got == t.key {
                    matches += 1;
                }
            }
        }
    }
    ctx.barrier.wait();

    (matches, checksum)
}
