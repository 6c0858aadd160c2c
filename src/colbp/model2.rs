//! Model II (§4.5.2): symmetric partitioning, one table per LLC group,
//! table ownership rotated across groups every iteration so build work
//! amortizes across LLCs while each table stays hot in whichever group
//! just finished building it.

use super::{drain_partition_run, group_size, numa_zero_share, position_in_group, ColbpInput};
use crate::context::{JoinContext, PayloadMode};
use crate::hashtable::HashTable;
use crate::icp::Cursors;

pub fn run(ctx: &JoinContext, tid: usize, input: &ColbpInput) -> (u64, u64) {
    let num_groups = ctx.num_groups();
    let group = ctx.group_of(tid);
    let r_bits = ctx.plan.r_bits();
    let fanout_r = 1usize << r_bits;
    let iters = fanout_r / num_groups;
    let mask = (fanout_r - 1) as u32;

    let table_len = (input.r_len.div_ceil(fanout_r) + 1).next_power_of_two();

    // Each group's leader (the smallest tid in that group, i.e. tid == group
    // under the round-robin placement invariant) allocates its own table.
    let table = ctx.tables.per_group[group].get_or_init(|| HashTable::allocate(table_len));
    let gs = group_size(ctx.num_threads(), num_groups, group);
    let pos = position_in_group(tid, num_groups);
    let (start, count) = crate::placement::sub_relation_span(table.len(), gs, pos);
    table.zero_range(start, start + count);
    ctx.barrier.wait();

    let tables: Vec<&HashTable> =
        (0..num_groups).map(|g| ctx.tables.per_group[g].get().expect("table allocated before barrier")).collect();

    let mut checksum = 0u64;
    let mut matches = 0u64;
    let mut r_cursors = Cursors::new(input.r_pos);
    let mut s_cursors = Cursors::new(input.s_pos);
    let mut step = 0usize;

    for i in 0..iters {
        for g in 0..num_groups {
            let h = (g + group) % num_groups;
            let p = h * iters + i;
            drain_partition_run(input.sub_r, input.r_pos, &mut r_cursors, 0, mask, h, p, |t| {
                tables[h].set((t.key >> r_bits) as usize, t.payload);
                checksum += t.key as u64;
            });
            ctx.staged.wait(step);
            step += 1;
        }

        for g in (0..num_groups).rev() {
            let h = (g + group) % num_groups;
            let p = h * iters + i;
            drain_partition_run(input.sub_s, input.s_pos, &mut s_cursors, 0, mask, h, p, |t| {
                let got = tables[h].get((t.key >> r_bits) as usize);
                checksum += got as u64;
                match ctx.payload_mode {
                    PayloadMode::Default => matches += 1,
                    PayloadMode::Test => {
                        if got == t.key {
                            matches += 1;
                        }
                    }
                }
            });
        }

        ctx.staged.wait(step);
        step += 1;
    }

    ctx.barrier.wait();
    (matches, checksum)
}
