//! Barrier integration tests (§4.2, §8 "Staged barrier: any N threads...").

use colbp_join::barrier::{Barrier, StagedBarrier};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn global_barrier_orders_every_threads_pre_and_post_phase_work() {
    let n = 16;
    let barrier = Arc::new(Barrier::new(n));
    let phase1 = Arc::new(AtomicU64::new(0));
    let phase2 = Arc::new(AtomicU64::new(0));

    thread::scope(|scope| {
        for _ in 0..n {
            let barrier = Arc::clone(&barrier);
            let phase1 = Arc::clone(&phase1);
            let phase2 = Arc::clone(&phase2);
            scope.spawn(move || {
                phase1.fetch_add(1, Ordering::SeqCst);
                barrier.wait();
                assert_eq!(phase1.load(Ordering::SeqCst), n as u64);
                phase2.fetch_add(1, Ordering::SeqCst);
                barrier.wait();
                assert_eq!(phase2.load(Ordering::SeqCst), n as u64);
            });
        }
    });
}

#[test]
fn staged_barrier_releases_all_n_threads_at_every_one_of_k_steps() {
    let n = 12;
    let k = 200;
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
