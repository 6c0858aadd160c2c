//! End-to-end scenarios and round-trip properties (TESTABLE PROPERTIES).

use colbp_join::context::JoinContext;
use colbp_join::engine::run_join;
use colbp_join::testing::{seeded_relations, triangular};
use colbp_join::topology::Topology;

fn topo() -> Topology {
    Topology::from_parts(2, 4, 2, 8 * 1024 * 1024, 64)
}

#[test]
fn scenario_1_single_thread_no_radix() {
    let (mut r, mut s) = seeded_relations(1024, 1024, 0.0);
    let ctx = JoinContext::build(topo(), 1, false, r.len(), 0.0, Some((0, 0))).unwrap();
    let (matches, checksum) = run_join(&ctx, &mut r, &mut s).unwrap();
    assert_eq!(matches, 1024);
    assert_eq!(checksum, 2 * triangular(1024));
}

#[test]
fn scenario_2_four_threads_radix_two() {
    let (mut r, mut s) = seeded_relations(1024, 4096, 0.0);
    let ctx = JoinContext::build(topo(), 4, false, r.len(), 0.0, Some((2, 2))).unwrap();
    let (matches, _checksum) = run_join(&ctx, &mut r, &mut s).unwrap();
    assert_eq!(matches, 4096);
}

#[test]
fn scenario_3_auto_selected_plan_picks_model_ii_for_a_large_relation() {
    let len = 1_048_576;
    let ctx = JoinContext::build(topo(), 8, false, len, 0.0, None).unwrap();
    assert_eq!(ctx.plan.r_bits(), ctx.plan.s_bits());
    assert!(ctx.plan.r_bits() > 0);

    let (mut r, mut s) = seeded_relations(len, len, 0.0);
    let (matches, _checksum) = run_join(&ctx, &mut r, &mut s).unwrap();
    assert_eq!(matches, len as u64);
}

#[test]
fn scenario_4_heavy_skew_rewrites_to_model_iii() {
    let len = 1_048_576;
    let ctx = JoinContext::build(topo(), 8, false, len, 1.2, None).unwrap();
    let initial_r_bits = ctx.plan.r_bits();

    let (mut r, mut s) = seeded_relations(len, 10 * len, 1.2);
    let (matches, _checksum) = run_join(&ctx, &mut r, &mut s).unwrap();

    assert_eq!(matches, (10 * len) as u64);
    assert!(ctx.plan_was_rewritten());
    assert_eq!(ctx.plan.s_bits(), 0);
    assert_eq!(ctx.plan.r_bits(), initial_r_bits + 1);
}

#[test]
fn scenario_5_max_parallelism_on_tiny_data() {
    let topo = Topology::from_parts(4, 8, 2, 8 * 1024 * 1024, 64);
    let (mut r, mut s) = seeded_relations(64, 64, 0.0);
    let ctx = JoinContext::build(topo, 64, false, r.len(), 0.0, Some((0, 0))).unwrap();
    let (matches, checksum) = run_join(&ctx, &mut r, &mut s).unwrap();
    assert_eq!(matches, 64);
    assert_eq!(checksum, 2 * triangular(64));
}

#[test]
fn scenario_6_user_pinned_radix_resists_rewrite_under_skew() {
    let len = 200_000;
    let ctx = JoinContext::build(topo(), 8, false, len, 1.2, Some((3, 3))).unwrap();
    let (mut r, mut s) = seeded_relations(len, 10 * len, 1.2);
    run_join(&ctx, &mut r, &mut s).unwrap();
    assert!(!ctx.plan_was_rewritten());
    assert!(ctx.plan.user_defined);
}

#[test]
fn radix_zero_matches_model_i() {
    let (mut r1, mut s1) = seeded_relations(5000, 20_000, 0.0);
    let ctx1 = JoinContext::build(topo(), 4, false, r1.len(), 0.0, Some((0, 0))).unwrap();
    let out1 = run_join(&ctx1, &mut r1, &mut s1).unwrap();

    let (mut r2, mut s2) = seeded_relations(5000, 20_000, 0.0);
    let ctx2 = JoinContext::build(topo(), 4, false, r2.len(), 0.0, None).unwrap();
    assert_eq!(ctx2.plan.r_bits(), 0);
    let out2 = run_join(&ctx2, &mut r2, &mut s2).unwrap();

    assert_eq!(out1, out2);
}

#[test]
fn repeated_runs_with_the_same_seed_are_byte_identical() {
    let mut results = Vec::new();
    for _ in 0..2 {
        let (mut r, mut s) = seeded_relations(8000, 32_000, 0.0);
        let ctx = JoinContext::build(topo(), 4, false, r.len(), 0.0, Some((2, 2))).unwrap();
        results.push(run_join(&ctx, &mut r, &mut s).unwrap());
    }
    assert_eq!(results[0], results[1]);
}

#[test]
fn topology_mismatch_is_reported_as_an_error_not_a_panic() {
    let topo = Topology::from_parts(1, 2, 1, 8 * 1024 * 1024, 64);
    let err = JoinContext::build(topo, 1000, false, 1000, 0.0, None);
    assert!(err.is_err());
}
