//! Model IV (§4.5.4, §9): asymmetric fanouts, `R_bits > S_bits > 0`.
//!
//! The component design leaves this unimplemented ("the dispatcher asserts
//! unreachability... a rewrite should either forbid this plan at selection
//! time or finish the implementation"). [`crate::plan::RadixPlan`] never
//! produces this shape on its own — plan selection only ever picks
//! `(0,0)`, `(r,r)`, or `(r,0)`, and the skew rewrite only ever demotes to
//! `(r,0)` — so the only way to reach this model is a user-pinned
//! `--radixR`/`--radixS` pair with `R_bits > S_bits > 0`. We reject that
//! combination as a fatal invariant violation rather than silently running
//! a model that was never implemented.

use super::ColbpInput;
use crate::context::JoinContext;
use crate::error::{JoinError, Result};

pub fn run(ctx: &JoinContext, _tid: usize, _input: &ColbpInput) -> Result<(u64, u64)> {
    Err(JoinError::PlanInvariantViolation {
        detail: format!(
            "Model IV (R_bits={} > S_bits={} > 0) has no implementation; pick a user-defined plan with S_bits == 0 or S_bits == R_bits",
            ctx.plan.r_bits(),
            ctx.plan.s_bits(),
        ),
    })
}
