//! Placement integration tests (§4.1).

use colbp_join::placement::{place, sub_relation_span};
use colbp_join::topology::Topology;

#[test]
fn placement_round_robins_across_llcs_before_filling_siblings() {
    let topo = Topology::from_parts(2, 4, 2, 8 * 1024 * 1024, 64);
    let placement = place(&topo, 6, false).unwrap();
    // 6 threads over 2 LLCs of capacity 8 (4 cores * 2 cpus) each utilizes
    // both LLCs, so num_groups == 2 and every thread's group must match
    // its round-robin position.
    assert_eq!(placement.num_groups, 2);
    for (t, slot) in placement.slots.iter().enumerate() {
        assert_eq!(slot.group, t % placement.num_groups);
    }
}

#[test]
fn favor_physical_cores_drops_to_one_llc_when_it_fits() {
    let topo = Topology::from_parts(2, 8, 2, 8 * 1024 * 1024, 64);
    let placement = place(&topo, 8, true).unwrap();
    assert_eq!(placement.num_groups, 1);
}

#[test]
fn sub_relation_span_partitions_are_contiguous_and_disjoint() {
    for (len, n) in [(100, 7), (1, 3), (0, 4), (97, 1)] {
        let mut at = 0usize;
        for t in 0..n {
            let (offset, count) = sub_relation_span(len, n, t);
            assert_eq!(offset, at);
            at += count;
        }
        assert_eq!(at, len);
    }
}
