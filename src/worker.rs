//! Per-thread entry point (§2 "Data flow"): ICP(S) with cooperative skew
//! detection, ICP(R), then whichever ColBP model the plan selects.

use crate::colbp::{self, ColbpInput};
use crate::context::JoinContext;
use crate::error::Result;
use crate::icp::{self, model_iii_shift};
use crate::plan::Model;
use crate::relation::Tuple;
use std::sync::atomic::Ordering;

/// Run this thread's share of the join. `sub_r`/`sub_s` are this thread's
/// disjoint slices of R and S (see [`crate::relation::split_relation_mut`]);
/// `r_len`/`s_len` are the *whole-relation* sizes, needed for the skew
/// escape hatch and for sizing Model I/III's table.
pub fn run(ctx: &JoinContext, tid: usize, sub_r: &mut [Tuple], sub_s: &mut [Tuple], r_len: usize, s_len: usize) -> Result<(u64, u64)> {
    let num_groups = ctx.num_groups();

    let mut s_result = icp::partition(sub_s, ctx.plan.s_bits(), 0, num_groups)?;

    if !ctx.plan.user_defined && !ctx.plan_was_rewritten() {
        let heavy =
            icp::estimate_skew(&s_result.first_block_histogram, r_len, s_len, s_result.first_block_size.max(1));
        if heavy {
            ctx.plan.skew_votes.fetch_add(1, Ordering::AcqRel);
        }
        ctx.staged.wait(0);

        if tid == 0 && ctx.plan.skew_votes.load(Ordering::Acquire) == ctx.num_threads() {
            ctx.rewrite_plan_to_model_iii();
        }
        ctx.staged.wait(1);

        if ctx.plan_was_rewritten() {
            s_result = icp::partition(sub_s, ctx.plan.s_bits(), 0, num_groups)?;
        }
    }

    let r_bits = ctx.plan.r_bits();
    let model = ctx.plan.model()?;
    let r_shift = if model == Model::III { model_iii_shift(r_len, r_bits) } else { 0 };
    let r_result = icp::partition(sub_r, r_bits, r_shift, num_groups)?;

    let input = ColbpInput {
        sub_r: &*sub_r,
        sub_s: &*sub_s,
        r_pos: &r_result.pos,
        s_pos: &s_result.pos,
        r_len,
        r_shift,
    };
    colbp::dispatch(ctx, tid, &input)
}
