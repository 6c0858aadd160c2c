//! Radix plan and model selection (§4.4, DATA MODEL "Radix plan").

use crate::error::{JoinError, Result};
use std::mem::size_of;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Bytes per hash-table bucket (a single payload cell).
pub const BUCKET_SIZE: usize = size_of::<u32>();

/// Which ColBP model the dispatcher selected (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Single shared hash table over unpartitioned R.
    I,
    /// Per-LLC hash tables, symmetric rotation.
    II,
    /// Single `|R|`-sized table partitioned by high-bit radix on R; S unpartitioned.
    III,
    /// Asymmetric fanouts (`R_bits > S_bits > 0`); deferred (§4.5.4, §9).
    IV,
}

/// `(R_bits, S_bits, user_defined)` plus the mutable state the skew
/// estimator can rewrite mid-stream (§4.3.1). Consolidates the `Radix`
/// global the §9 design note calls out into an explicit, shared value.
pub struct RadixPlan {
    pub r_bits: AtomicUsize,
    pub s_bits: AtomicUsize,
    pub user_defined: bool,
    /// Latched once thread 0 rewrites the plan on unanimous skew.
    pub changed_radix_s: AtomicBool,
    /// Threads that observed heavy skew on the first block of their SubS.
    pub skew_votes: AtomicUsize,
}

impl RadixPlan {
    pub fn r_bits(&self) -> usize {
        self.r_bits.load(Ordering::Acquire)
    }

    pub fn s_bits(&self) -> usize {
        self.s_bits.load(Ordering::Acquire)
    }

    /// Select an initial plan from relation sizes and LLC size (§4.4).
    ///
    /// If `|R| * BUCKET_SIZE <= 6/5 * llc_size`, Model I (`r=s=0`);
    /// otherwise both fanouts are set so each R-partition's table fits in
    /// about 2/3 of the LLC.
    pub fn select(r_len: usize, llc_size: usize, num_groups: usize) -> Result<RadixPlan> {
        let r_bytes = r_len * BUCKET_SIZE;
        let (r_bits, s_bits) = if r_bytes * 5 <= llc_size * 6 {
            (0, 0)
        } else {
            let target = (llc_size * 2) / 3;
            let bits = ceil_log2(r_bytes.div_ceil(target.max(1)));
            (bits, bits)
        };

        validate_fanout_divisibility(r_bits, num_groups)?;
        validate_fanout_divisibility(s_bits, num_groups)?;

        Ok(RadixPlan {
            r_bits: AtomicUsize::new(r_bits),
            s_bits: AtomicUsize::new(s_bits),
            user_defined: false,
            changed_radix_s: AtomicBool::new(false),
            skew_votes: AtomicUsize::new(0),
        })
    }

    /// Build a plan the user pinned via `--radix`/`--radixR`/`--radixS`.
    /// Latches `user_defined`, which disables skew-triggered rewrites.
    pub fn user_defined(r_bits: usize, s_bits: usize, num_groups: usize) -> Result<RadixPlan> {
        validate_fanout_divisibility(r_bits, num_groups)?;
        validate_fanout_divisibility(s_bits, num_groups)?;
        Ok(RadixPlan {
            r_bits: AtomicUsize::new(r_bits),
            s_bits: AtomicUsize::new(s_bits),
            user_defined: true,
            changed_radix_s: AtomicBool::new(false),
            skew_votes: AtomicUsize::new(0),
        })
    }

    /// Dispatch the model for the current `(r_bits, s_bits)` (§4.4 table).
    pub fn model(&self) -> Result<Model> {
        let (r, s) = (self.r_bits(), self.s_bits());
        match (r, s) {
            (0, 0) => Ok(Model::I),
            (r, s) if r == s && r > 0 => Ok(Model::II),
            (r, 0) if r > 0 => Ok(Model::III),
            (r, s) if r > s && s > 0 => Ok(Model::IV),
            (r, s) => Err(JoinError::PlanInvariantViolation {
                detail: format!("no model covers (R_bits={r}, S_bits={s})"),
            }),
        }
    }
}

/// `fanout % num_groups == 0` (DATA MODEL invariants; §9 open question).
/// Fanout 1 (bits == 0) trivially satisfies this for any `num_groups`
/// since Model I/III don't partition into per-group tables on that side.
pub fn validate_fanout_divisibility(bits: usize, num_groups: usize) -> Result<()> {
    if bits == 0 {
        return Ok(());
    }
    let fanout = 1usize << bits;
    if fanout % num_groups != 0 {
        return Err(JoinError::PlanInvariantViolation {
            detail: format!("fanout {fanout} (2^{bits}) is not a multiple of num_groups {num_groups}"),
        });
    }
    Ok(())
}

pub(crate) fn ceil_log2(x: usize) -> usize {
    if x <= 1 {
        return 0;
    }
    (usize::BITS - (x - 1).leading_zeros()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_r_selects_model_i() {
        let plan = RadixPlan::select(1000, 8 * 1024 * 1024, 4).unwrap();
        assert_eq!(plan.r_bits(), 0);
        assert_eq!(plan.s_bits(), 0);
        assert_eq!(plan.model().unwrap(), Model::I);
    }

    #[test]
    fn large_r_selects_model_ii_with_matching_bits() {
        // |R| * 4 bytes far exceeds the LLC -> Model II with r_bits == s_bits > 0.
        let plan = RadixPlan::select(1_048_576, 8 * 1024 * 1024, 8).unwrap();
        assert!(plan.r_bits() > 0);
        assert_eq!(plan.r_bits(), plan.s_bits());
        assert_eq!(plan.model().unwrap(), Model::II);
        let fanout = 1usize << plan.r_bits();
        assert_eq!(fanout % 8, 0);
    }

    #[test]
    fn model_iii_after_skew_demotion_shape() {
        let plan = RadixPlan::user_defined(4, 0, 4).unwrap();
        assert_eq!(plan.model().unwrap(), Model::III);
    }

    #[test]
    fn indivisible_fanout_is_rejected() {
        assert!(RadixPlan::user_defined(1, 1, 4).is_err());
    }
}
