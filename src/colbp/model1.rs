//! Model I (§4.5.1): no partitioning, one shared table over unpartitioned R.

use super::{numa_zero_share, ColbpInput};
use crate::context::{JoinContext, PayloadMode};
use crate::hashtable::HashTable;

pub fn run(ctx: &JoinContext, tid: usize, input: &ColbpInput) -> (u64, u64) {
    let table = ctx.tables.single.get_or_init(|| HashTable::allocate(input.r_len + 1));
    numa_zero_share(table, tid, 1, ctx.num_threads());
    ctx.barrier.wait();

    let mut checksum = 0u64;
    for t in input.sub_r {
        table.set(t.key as usize, t.payload);
        checksum += t.key as u64;
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
