//! Barrier primitives (§4.2).
//!
//! Two flavors, both over all `N` worker threads:
//!
//! - [`Barrier`]: a one-shot, reusable, generation-counter barrier backed by
//!   a mutex + condvar. Used between ICP and ColBP phases, where barrier
//!   frequency is low and blocking (rather than spinning) is the right
//!   trade-off.
//! - [`StagedBarrier`]: a rotating-slot, busy-waiting barrier for the
//!   high-frequency rendezvous points inside ColBP's build/probe
//!   iterations, where a mutex's cost would dominate the work being
//!   synchronized.

use crate::error::{JoinError, Result};
use std::sync::atomic::{fence, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

/// A one-shot, reusable barrier for `n` threads.
pub struct Barrier {
    inner: Mutex<BarrierState>,
    condvar: Condvar,
    n: usize,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
}

impl Barrier {
    pub fn new(n: usize) -> Self {
        Self {
            inner: Mutex::new(BarrierState { arrived: 0, generation: 0 }),
            condvar: Condvar::new(),
            n,
        }
    }

    /// Block until all `n` threads have called `wait` for the current
    /// generation. Establishes happens-before between every thread's
    /// pre-barrier and post-barrier actions.
    pub fn wait(&self) {
        let mut state = self.inner.lock().unwrap();
        let my_generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.n {
            state.arrived = 0;
            state.generation += 1;
            self.condvar.notify_all();
        } else {
            while state.generation == my_generation {
                state = self.condvar.wait(state).unwrap();
            }
        }
    }
}

/// Number of slots a [`StagedBarrier`] rotates through. Using several slots
/// (rather than one) lets thread 0 clear the *previous* slot while other
/// threads are already arriving at the *next* one, without a data race.
pub const STAGED_BARRIER_SLOTS: usize = 4;

/// A rotating-slot barrier for `n` threads, optimized for many short,
/// high-frequency phases. Each thread must call [`StagedBarrier::wait`]
/// exactly as many times as every other thread for the same conceptual
/// phase sequence; mismatched call counts are a logic error the type
/// cannot detect on its own (see `debug_step` for a debug-only check).
pub struct StagedBarrier {
    slots: [AtomicUsize; STAGED_BARRIER_SLOTS],
    n: usize,
    #[cfg(debug_assertions)]
    debug_step: AtomicUsize,
}

impl StagedBarrier {
    pub fn new(n: usize) -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicUsize::new(0)),
            n,
            #[cfg(debug_assertions)]
            debug_step: AtomicUsize::new(0),
        }
    }

    /// Rendezvous at `step` (the caller's monotonically increasing local
    /// step counter). Busy-waits until all `n` threads have arrived at this
    /// step, then clears the slot two rotations behind so it's ready for
    /// reuse once all threads have moved past it.
    pub fn wait(&self, step: usize) {
        let slot = step % STAGED_BARRIER_SLOTS;
        let arrived = self.slots[slot].fetch_add(1, Ordering::AcqRel) + 1;
        if arrived == self.n {
            fence(Ordering::AcqRel);
            let prev = (slot + STAGED_BARRIER_SLOTS - 1) % STAGED_BARRIER_SLOTS;
            self.slots[prev].store(0, Ordering::Relaxed);
        } else {
            while self.slots[slot].load(Ordering::Acquire) != self.n {
                std::hint::spin_loop();
            }
        }
    }

    /// Debug-only guard: call once per thread per step to catch a thread
    /// that invoked the staged barrier a different number of times than
    /// its peers. Not part of the hot path; only compiled into debug
    /// builds and tests.
    #[cfg(debug_assertions)]
    pub fn assert_in_step(&self, expected_step: usize) -> Result<()> {
        let seen = self.debug_step.fetch_add(1, Ordering::Relaxed) / self.n;
        if seen != expected_step {
            return Err(JoinError::BarrierMisuse {
                detail: format!("thread reached step {seen}, expected step {expected_step}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn global_barrier_releases_only_after_all_arrive() {
        let n = 8;
        let barrier = Arc::new(Barrier::new(n));
        let counter = Arc::new(AtomicU64::new(0));

        thread::scope(|scope| {
            for _ in 0..n {
                let barrier = Arc::clone(&barrier);
                let counter = Arc::clone(&counter);
                scope.spawn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    barrier.wait();
                    // Every thread should observe the full count post-barrier.
                    assert_eq!(counter.load(Ordering::SeqCst), n as u64);
                });
            }
        });
    }

    #[test]
    fn barrier_is_reusable_across_phases() {
        let n = 4;
        let barrier = Arc::new(Barrier::new(n));
        thread::scope(|scope| {
            for _ in 0..n {
                let barrier = Arc::clone(&barrier);
                scope.spawn(move || {
                    barrier.wait();
                    barrier.wait();
                    barrier.wait();
                });
            }
        });
    }

    #[test]
    fn staged_barrier_agrees_on_k_release_events() {
        let n = 6;
        let k = 50;
        let barrier = Arc::new(StagedBarrier::new(n));
        let released = Arc::new(AtomicU64::new(0));

        thread::scope(|scope| {
            for _ in 0..n {
                let barrier = Arc::clone(&barrier);
                let released = Arc::clone(&released);
                scope.spawn(move || {
                    for step in 0..k {
                        barrier.wait(step);
                        released.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(released.load(Ordering::Relaxed), (n * k) as u64);
    }
}
