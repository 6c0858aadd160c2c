//! Array-of-buckets hash tables (§3 "Bucket", §4.5).
//!
//! There's no collision handling: R's keys are a dense permutation of
//! `[1..=|R|]`, so `table[key]` (unpartitioned models) or
//! `table[key >> shift]` (partitioned models) is a perfect hash. A bucket
//! holds one payload; `0` doubles as "empty" since payloads here are
//! 1-based foreign/primary keys and the zero key never occurs (§3's
//! `Tuple` keys start at 1).
//!
//! Tables are allocated by one "leader" thread and then NUMA-localized by
//! having every thread first-touch (zero) its own disjoint slice, per the
//! Lifecycles paragraph in §3 and the build steps in §4.5.

use std::sync::atomic::{AtomicU32, Ordering};

/// A single shared hash table, `len` buckets wide.
///
/// Each cell is written by exactly one thread during build (R's keys are
/// unique and partitions are disjoint, per the §5 "Shared mutable state"
/// argument), so plain relaxed atomics are enough: there's no read/write
/// race to order, only a publication the caller's barrier already
/// establishes happens-before for.
pub struct HashTable {
    buckets: Vec<AtomicU32>,
}

impl HashTable {
    /// Allocate (but do not zero) `len` buckets. Zeroing is a separate,
    /// explicit step so callers can split it across threads for NUMA
    /// first-touch (see [`HashTable::zero_range`]).
    pub fn allocate(len: usize) -> Self {
        let mut buckets = Vec::with_capacity(len);
        buckets.resize_with(len, || AtomicU32::new(0));
        Self { buckets }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Zero `[start, end)`. Each thread should call this on a disjoint
    /// slice of the table it's about to build into, so the first touch of
    /// every page comes from the thread that will use it.
    pub fn zero_range(&self, start: usize, end: usize) {
        for cell in &self.buckets[start..end] {
            cell.store(0, Ordering::Relaxed);
        }
    }

    /// Write `payload` into bucket `index`. The caller is responsible for
    /// the disjointness argument: exactly one thread may call this for any
    /// given `index` during a build phase.
    pub fn set(&self, index: usize, payload: u32) {
        self.buckets[index].store(payload, Ordering::Relaxed);
    }

    /// Read bucket `index`. Valid only after a barrier against every build
    /// writer.
    pub fn get(&self, index: usize) -> u32 {
        self.buckets[index].load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_table_reads_back_zero() {
        let table = HashTable::allocate(16);
        table.zero_range(0, 16);
        for i in 0..16 {
            assert_eq!(table.get(i), 0);
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let table = HashTable::allocate(8);
        table.zero_range(0, 8);
        table.set(3, 42);
        assert_eq!(table.get(3), 42);
        assert_eq!(table.get(0), 0);
    }

    #[test]
    fn disjoint_zero_ranges_cover_the_whole_table_from_multiple_threads() {
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(HashTable::allocate(1000));
        thread::scope(|scope| {
            for t in 0..4 {
                let table = Arc::clone(&table);
                scope.spawn(move || {
                    let (start, count) = crate::placement::sub_relation_span(1000, 4, t);
                    table.zero_range(start, start + count);
                });
            }
        });
        for i in 0..1000 {
            assert_eq!(table.get(i), 0);
        }
    }
}
