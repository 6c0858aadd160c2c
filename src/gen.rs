//! Relation generation: uniform primary keys, uniform and Zipfian foreign
//! keys. This is the external-collaborator surface spec.md places out of
//! scope for the core engine; it's implemented here only so the crate is
//! runnable end to end. Nothing in `icp`, `colbp`, or `context` depends on
//! how these tuples were produced, only on the `Relation` they end up in.

use crate::relation::{Relation, RelationId, Tuple};
use rayon::prelude::*;

/// Deterministic, splittable PRNG (xorshift64*). Good enough for generating
/// test/benchmark data; not cryptographic.
#[derive(Clone, Copy)]
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_usize(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }

    /// A fast fork of this generator for a given thread/chunk index, so
    /// parallel generation is reproducible regardless of thread count.
    fn fork(seed: u64, index: usize) -> Self {
        Xorshift64::new(seed ^ (index as u64).wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1))
    }
}

/// Build R: a uniformly shuffled permutation of `[1..=len]`, payload seeded
/// to key (§9 open question: the generator leaves payload initialization
/// to the caller; tests and benchmarks here always seed `payload = key` so
/// checksums are reproducible).
pub fn primary_key_relation(len: usize, seed: u64) -> Relation {
    let mut keys: Vec<u32> = (1..=len as u32).collect();
    let mut rng = Xorshift64::new(seed);
    // Fisher-Yates shuffle.
    for i in (1..keys.len()).rev() {
        let j = rng.next_usize(i + 1);
        keys.swap(i, j);
    }
    let tuples = keys.into_iter().map(|key| Tuple { key, payload: key }).collect();
    Relation { id: RelationId::R, tuples }
}

/// Build S: `len` foreign keys cyclically assigned from a shuffled
/// permutation of `[1..=key_range]`, so occurrences of each key are balanced
/// across S (exactly `len / key_range` each when `key_range` divides `len`)
/// rather than left to wherever i.i.d. sampling happens to land.
pub fn uniform_foreign_key_relation(len: usize, key_range: usize, seed: u64) -> Relation {
    let key_range = key_range.max(1);
    let mut keys: Vec<u32> = (1..=key_range as u32).collect();
    let mut rng = Xorshift64::new(seed);
    for i in (1..keys.len()).rev() {
        let j = rng.next_usize(i + 1);
        keys.swap(i, j);
    }
    let tuples: Vec<Tuple> = (0..len)
        .into_par_iter()
        .map(|i| {
            let key = keys[i % key_range];
            Tuple { key, payload: key }
        })
        .collect();
    Relation { id: RelationId::S, tuples }
}

/// Build S with a Zipfian skew over `[1..=key_range]` with exponent `zipf`.
/// Uses inverse-CDF sampling over a precomputed harmonic-number table,
/// which is exact (not an approximation) and cheap to parallelize since
/// the table is read-only shared state.
pub fn zipf_foreign_key_relation(len: usize, key_range: usize, zipf: f64, seed: u64) -> Relation {
    if zipf <= 0.0 || key_range == 0 {
        return uniform_foreign_key_relation(len, key_range.max(1), seed);
    }

    let mut weights = Vec::with_capacity(key_range);
    let mut total = 0.0f64;
    for k in 1..=key_range {
        total += 1.0 / (k as f64).powf(zipf);
        weights.push(total);
    }

    let chunks = rayon::current_num_threads().max(1);
    let tuples = gen_parallel(len, chunks, seed, move |rng| {
        let target = (rng.next_u64() as f64 / u64::MAX as f64) * total;
        let key = match weights.binary_search_by(|w| w.partial_cmp(&target).unwrap()) {
            Ok(i) | Err(i) => i.min(key_range - 1) + 1,
        };
        Tuple { key: key as u32, payload: key as u32 }
    });
    Relation { id: RelationId::S, tuples }
}

fn gen_parallel<F>(len: usize, chunks: usize, seed: u64, f: F) -> Vec<Tuple>
where
    F: Fn(&mut Xorshift64) -> Tuple + Sync + Send,
{
    let chunk_len = len.div_ceil(chunks.max(1));
    (0..len)
        .collect::<Vec<_>>()
        .par_chunks(chunk_len)
        .enumerate()
        .flat_map(|(chunk_idx, indices)| {
            let mut rng = Xorshift64::fork(seed, chunk_idx);
            indices.iter().map(|_| f(&mut rng)).collect::<Vec<_>>()
        })
        .collect()
}
