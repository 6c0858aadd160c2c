//! `run_join` (§5 "Scheduling model"): spawns one pinned OS thread per
//! worker, waits for all of them, and reduces their `(matches, checksum)`
//! accumulators. No cooperative scheduling, no async — a single batch job
//! whose only blocking points are the barriers inside [`worker::run`].

use crate::context::JoinContext;
use crate::error::{JoinError, Result};
use crate::relation::{split_relation_mut, Relation};
use crate::worker;
use core_affinity::CoreId;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread;

enum Outcome {
    Success(u64, u64),
    Failed(JoinError),
}

/// Run the join, returning `(total_matches, global_checksum)` (§6
/// "Outputs"). `r`/`s` are split into `ctx.num_threads()` disjoint,
/// contiguous sub-relations and reordered in place by ICP; callers that
/// need the original tuple order should keep their own copy.
pub fn run_join(ctx: &JoinContext, r: &mut Relation, s: &mut Relation) -> Result<(u64, u64)> {
    let n = ctx.num_threads();
    let r_len = r.len();
    let s_len = s.len();
    let sub_rs = split_relation_mut(&mut r.tuples, n);
    let sub_ss = split_relation_mut(&mut s.tuples, n);

    let outcomes: Vec<Mutex<Option<Outcome>>> = (0..n).map(|_| Mutex::new(None)).collect();

    thread::scope(|scope| {
        for (tid, (sub_r, sub_s)) in sub_rs.into_iter().zip(sub_ss).enumerate() {
            let slot = ctx.placement.slots[tid];
            let cell = &outcomes[tid];
            scope.spawn(move || {
                if !core_affinity::set_for_current(CoreId { id: slot.os_cpu_id }) {
                    eprintln!("colbp-join: could not pin worker {tid} to cpu {}", slot.os_cpu_id);
                }

                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| worker::run(ctx, tid, sub_r, sub_s, r_len, s_len)));
                let outcome = match result {
                    Ok(Ok((matches, checksum))) => Outcome::Success(matches, checksum),
                    Ok(Err(e)) => Outcome::Failed(e),
                    Err(payload) => Outcome::Failed(JoinError::WorkerPanicked(format!(
                        "worker {tid} panicked: {}",
                        panic_message(payload.as_ref())
                    ))),
                };
                *cell.lock().unwrap() = Some(outcome);
            });
        }
    });

    let mut total_matches = 0u64;
    let mut total_checksum = 0u64;
    for cell in outcomes {
        match cell.into_inner().unwrap() {
            Some(Outcome::Success(matches, checksum)) => {
                total_matches += matches;
                total_checksum += checksum;
            }
            Some(Outcome::Failed(e)) => return Err(e),
            None => {
                return Err(JoinError::WorkerPanicked("a worker exited without reporting an outcome".into()));
            }
        }
    }

    Ok((total_matches, total_checksum))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
