//! ICP integration tests (§4.3, §8 "For any radix r >= 0...").

use colbp_join::icp::{partition, PosCell};
use colbp_join::relation::Tuple;

fn tuples(keys: &[u32]) -> Vec<Tuple> {
    keys.iter().map(|&key| Tuple { key, payload: key }).collect()
}

fn partition_of(key: u32, shift: usize, mask: u32) -> usize {
    ((key >> shift) & mask) as usize
}

#[test]
fn partitioning_across_multiple_blocks_preserves_the_multiset_and_windows() {
    // Force more than one block: CHUNK_SIZE is 1 << 15, so 3 * CHUNK_SIZE + remainder
    // exercises the remainder-block path the in-place scratch scheme has to handle.
    let len = 3 * (1 << 15) + 777;
    let keys: Vec<u32> = (0..len as u32).map(|k| k.wrapping_mul(2654435761)).collect();
    let mut before: Vec<u32> = keys.clone();
    before.sort_unstable();

    let mut sub = tuples(&keys);
    let r_bits = 3;
    let num_sub_blocks = 4;
    let result = partition(&mut sub, r_bits, 0, num_sub_blocks).unwrap();

    let mut after: Vec<u32> = sub.iter().map(|t| t.key).collect();
    after.sort_unstable();
    assert_eq!(before, after);

    let fanout = 1usize << r_bits;
    let sub_blocks_per_partition = fanout / num_sub_blocks;
    let mut covered = vec![false; fanout];
    for row in &result.pos {
        for (m, cell) in row.iter().enumerate() {
            let lo = m * sub_blocks_per_partition;
            let hi = lo + sub_blocks_per_partition;
            for p in lo..hi {
                covered[p] = true;
            }
            for t in &sub[cell.start..cell.end] {
                let p = partition_of(t.key, 0, (fanout - 1) as u32);
                assert!((lo..hi).contains(&p));
            }
        }
    }
    assert!(covered.iter().all(|&c| c));
}

#[test]
fn zero_radix_is_a_literal_no_op_over_the_whole_relation() {
    let keys: Vec<u32> = (1..=500u32).collect();
    let original = tuples(&keys);
    let mut sub = original.clone();
    let result = partition(&mut sub, 0, 0, 2).unwrap();
    assert_eq!(sub, original);

    let total: usize = result.pos.iter().flat_map(|row| row.iter().map(PosCell::len)).sum();
    assert_eq!(total, 500);
}
