//! ICP — in-place cache-aware partitioning (§4.3).
//!
//! A sub-relation is walked block by block (`ChunkSize` tuples at a time);
//! each block is copied into a reused scratch buffer, radix-partitioned
//! there, and scattered back into the exact physical range it came from.
//! Only one block's worth of scratch is ever live, so the extra memory is
//! `O(ChunkSize)` regardless of `|Sub|` — the "in-place" and "cache-aware"
//! halves of the name. See the "block rotation" note in [`DESIGN.md`] at
//! the repository root for why this reuses a per-block scratch buffer
//! rather than the cross-block rotating scratch the component design
//! sketches: that scheme's capacity bookkeeping only closes when
//! `|Sub| % num_blocks == 0`, and this module has to handle the remainder
//! case too.
//!
//! Skew estimation (§4.3.1) is a separate, pure function over a block's
//! raw histogram: it doesn't need to know anything about barriers or plan
//! rewriting, which live one layer up in `worker`/`context` where the
//! thread coordination actually happens.

use crate::error::{JoinError, Result};
use crate::relation::Tuple;

/// Blocks of up to this many tuples, per §3 ("Block and sub-block").
pub const CHUNK_SIZE: usize = 1 << 15;

/// The `(start, end)` range of one `(block, sub_block)` cell, immutable
/// once ICP finishes. Iteration cursors live separately in [`Cursors`]
/// per the §9 design note ("avoid conflating immutable partition layout
/// with mutable iteration state").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosCell {
    pub start: usize,
    pub end: usize,
}

impl PosCell {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The full result of partitioning one sub-relation: the `[block][sub_block]`
/// position matrix, plus the raw (pre-prefix-sum) histogram of the first
/// block, which the caller needs for skew estimation without rescanning.
pub struct IcpResult {
    pub pos: Vec<Vec<PosCell>>,
    pub first_block_histogram: Vec<usize>,
    pub first_block_size: usize,
}

/// Mutable iteration cursors over an [`IcpResult`]'s position matrix.
/// ColBP's build/probe loops advance a cell's cursor as they consume
/// tuples from it; kept as a parallel structure so the immutable layout
/// in [`IcpResult::pos`] is never mutated after ICP produces it.
pub struct Cursors(Vec<Vec<usize>>);

impl Cursors {
    pub fn new(pos: &[Vec<PosCell>]) -> Self {
        Cursors(pos.iter().map(|row| row.iter().map(|c| c.start).collect()).collect())
    }

    /// Returns the cursor's current value and advances it by `n`.
    pub fn advance(&mut self, block: usize, sub_block: usize, n: usize) -> usize {
        let cursor = &mut self.0[block][sub_block];
        let at = *cursor;
        *cursor += n;
        at
    }

    pub fn get(&self, block: usize, sub_block: usize) -> usize {
        self.0[block][sub_block]
    }
}

fn partition_of(key: u32, shift: usize, mask: u32) -> usize {
    ((key >> shift) & mask) as usize
}

/// The high-bit shift ICP(R) uses under Model III (§4.3 "Shift semantics"):
/// partitioning on R's high bits keeps each partition's keys dense in a
/// narrow range, which is what lets Model III probe `table[key]` directly
/// into a single `|R|+1`-sized table.
pub fn model_iii_shift(r_len: usize, r_bits: usize) -> usize {
    crate::plan::ceil_log2(r_len).saturating_sub(r_bits + 1)
}

/// Partition `sub` in place into `fanout = 2^r_bits` radix partitions using
/// `(key >> shift) & (fanout - 1)`, laying out `num_sub_blocks` contiguous
/// windows per block (§3, §4.3). `r_bits == 0` is the documented no-op:
/// `sub` is left untouched and every sub-block window is just an even
/// split of the block's own range, since there's only one partition.
pub fn partition(sub: &mut [Tuple], r_bits: usize, shift: usize, num_sub_blocks: usize) -> Result<IcpResult> {
    let fanout = 1usize << r_bits;
    if fanout > 1 && fanout % num_sub_blocks != 0 {
        return Err(JoinError::PlanInvariantViolation {
            detail: format!("fanout {fanout} is not a multiple of num_sub_blocks {num_sub_blocks}"),
        });
    }

    let len = sub.len();
    if len == 0 {
        return Ok(IcpResult { pos: Vec::new(), first_block_histogram: vec![0; fanout], first_block_size: 0 });
    }

    let num_blocks = len.div_ceil(CHUNK_SIZE);
    let base = len / num_blocks;
    let remainder = len % num_blocks;

    let mut block_starts = Vec::with_capacity(num_blocks);
    let mut block_sizes = Vec::with_capacity(num_blocks);
    let mut at = 0usize;
    for b in 0..num_blocks {
        let size = base + usize::from(b < remainder);
        block_starts.push(at);
        block_sizes.push(size);
        at += size;
    }
    debug_assert_eq!(at, len);

    if fanout == 1 {
        let mut pos = Vec::with_capacity(num_blocks);
        for b in 0..num_blocks {
            pos.push(even_split_windows(block_starts[b], block_sizes[b], num_sub_blocks));
        }
        return Ok(IcpResult { pos, first_block_histogram: vec![len; 1], first_block_size: block_sizes[0] });
    }

    let mask = (fanout - 1) as u32;
    let sub_blocks_per_partition = fanout / num_sub_blocks;
    let mut scratch = vec![Tuple::default(); block_sizes[0]];
    let mut pos = Vec::with_capacity(num_blocks);
    let mut first_block_histogram = vec![0usize; fanout];

    for b in 0..num_blocks {
        let start = block_starts[b];
        let size = block_sizes[b];
        let region = &mut sub[start..start + size];
        let scratch = &mut scratch[..size];
        scratch.copy_from_slice(region);

        let mut histogram = vec![0usize; fanout];
        for t in scratch.iter() {
            histogram[partition_of(t.key, shift, mask)] += 1;
        }
        if b == 0 {
            first_block_histogram.copy_from_slice(&histogram);
        }

        let mut offsets = vec![0usize; fanout];
        let mut acc = 0usize;
        for (p, count) in histogram.iter().enumerate() {
            offsets[p] = acc;
            acc += count;
        }
        debug_assert_eq!(acc, size);

        let mut row = Vec::with_capacity(num_sub_blocks);
        for m in 0..num_sub_blocks {
            let first_partition = m * sub_blocks_per_partition;
            let last_partition_excl = first_partition + sub_blocks_per_partition;
            let local_start = offsets[first_partition];
            let local_end = if last_partition_excl < fanout { offsets[last_partition_excl] } else { size };
            row.push(PosCell { start: start + local_start, end: start + local_end });
        }
        pos.push(row);

        let mut write = offsets;
        for t in scratch.iter() {
            let p = partition_of(t.key, shift, mask);
            region[write[p]] = *t;
            write[p] += 1;
        }
    }

    Ok(IcpResult { pos, first_block_histogram, first_block_size: block_sizes[0] })
}

fn even_split_windows(block_start: usize, block_size: usize, num_sub_blocks: usize) -> Vec<PosCell> {
    let mut row = Vec::with_capacity(num_sub_blocks);
    let mut at = block_start;
    for m in 0..num_sub_blocks {
        let (_, count) = crate::placement::sub_relation_span(block_size, num_sub_blocks, m);
        row.push(PosCell { start: at, end: at + count });
        at += count;
    }
    row
}

/// Skew estimation over a block's raw (pre-prefix-sum) partition histogram
/// (§4.3.1). `r_len`/`s_len` are the *whole-relation* sizes, not sub-relation
/// sizes, matching "the skew escape hatch is only triggered when S dominates".
pub fn estimate_skew(histogram: &[usize], r_len: usize, s_len: usize, block_size: usize) -> bool {
    if r_len == 0 || (s_len as f64) / (r_len as f64) < 3.0 {
        return false;
    }

    let fanout_s = histogram.len();
    let (mut max_a, mut max_b) = (0usize, 0usize);
    for &count in histogram {
        if count > max_a {
            max_b = max_a;
            max_a = count;
        } else if count > max_b {
            max_b = count;
        }
    }

    if fanout_s > 4 {
        (max_a + max_b) as f64 > 0.35 * block_size as f64
    } else {
        max_a as f64 > 0.5 * block_size as f64 + 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Tuple;

    fn tuples(keys: &[u32]) -> Vec<Tuple> {
        keys.iter().map(|&key| Tuple { key, payload: key }).collect()
    }

    fn multiset(tuples: &[Tuple]) -> Vec<u32> {
        let mut keys: Vec<u32> = tuples.iter().map(|t| t.key).collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn partition_preserves_the_multiset() {
        let keys: Vec<u32> = (0..5000u32).map(|k| k.wrapping_mul(2654435761)).collect();
        let before = multiset(&tuples(&keys));
        let mut sub = tuples(&keys);
        partition(&mut sub, 3, 0, 4).unwrap();
        assert_eq!(multiset(&sub), before);
    }

    #[test]
    fn every_sub_block_window_holds_only_its_own_partitions() {
        let keys: Vec<u32> = (0..70_000u32).map(|k| k.wrapping_mul(40503)).collect();
        let mut sub = tuples(&keys);
        let r_bits = 4;
        let fanout = 1usize << r_bits;
        let num_sub_blocks = 4;
        let result = partition(&mut sub, r_bits, 0, num_sub_blocks).unwrap();
        let sub_blocks_per_partition = fanout / num_sub_blocks;

        for row in &result.pos {
            for (m, cell) in row.iter().enumerate() {
                let lo = m * sub_blocks_per_partition;
                let hi = lo + sub_blocks_per_partition;
                for t in &sub[cell.start..cell.end] {
                    let p = partition_of(t.key, 0, (fanout - 1) as u32);
                    assert!(p >= lo && p < hi, "partition {p} outside window [{lo}, {hi})");
                }
            }
        }
    }

    #[test]
    fn sub_block_windows_union_to_the_whole_block() {
        let keys: Vec<u32> = (0..10_000u32).collect();
        let mut sub = tuples(&keys);
        let result = partition(&mut sub, 3, 0, 4).unwrap();
        for (b, row) in result.pos.iter().enumerate() {
            assert_eq!(row.first().unwrap().start, {
                let mut total_before = 0;
                for prev in &result.pos[..b] {
                    total_before += prev.last().unwrap().end - prev.first().unwrap().start;
                }
                total_before
            });
            for w in row.windows(2) {
                assert_eq!(w[0].end, w[1].start);
            }
        }
    }

    #[test]
    fn zero_radix_is_a_literal_no_op() {
        let keys: Vec<u32> = vec![9, 3, 7, 1, 5, 2, 8, 4, 6];
        let before = tuples(&keys);
        let mut sub = before.clone();
        let result = partition(&mut sub, 0, 0, 3).unwrap();
        assert_eq!(sub, before);
        let total: usize = result.pos.iter().map(|row| row.iter().map(|c| c.len()).sum::<usize>()).sum();
        assert_eq!(total, sub.len());
    }

    #[test]
    fn skew_is_not_reported_when_s_does_not_dominate_r() {
        assert!(!estimate_skew(&[1000, 0, 0, 0], 1000, 2000, 1000));
    }

    #[test]
    fn skew_is_reported_for_a_hot_single_bucket_with_small_fanout() {
        let histogram = vec![900, 100];
        assert!(estimate_skew(&histogram, 100, 1000, 1000));
    }

    #[test]
    fn skew_is_not_reported_for_a_balanced_histogram() {
        let histogram = vec![125; 8];
        assert!(!estimate_skew(&histogram, 100, 1000, 1000));
    }
}
