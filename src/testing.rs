//! Test data helpers for the join engine (§9 "payload initialization").
//!
//! The external generator only fills `key`; `payload` is left to the
//! caller so checksums are reproducible. Every test and benchmark in this
//! crate goes through [`seeded_relations`], which seeds `payload = key` on
//! both sides so end-to-end scenarios can assert exact `(matches,
//! checksum)` values instead of just shapes.

use crate::gen::{primary_key_relation, uniform_foreign_key_relation, zipf_foreign_key_relation};
use crate::relation::Relation;

/// Build `R` as a shuffled permutation of `[1..=r_len]` and `S` as `s_len`
/// foreign keys over `R`'s key range, skewed by `skew` (0.0 for uniform).
/// Both relations seed `payload = key`, matching the checksum formulas in
/// TESTABLE PROPERTIES.
pub fn seeded_relations(r_len: usize, s_len: usize, skew: f64) -> (Relation, Relation) {
    let r = primary_key_relation(r_len, 1);
    let s = if skew > 0.0 {
        zipf_foreign_key_relation(s_len, r_len, skew, 2)
    } else {
        uniform_foreign_key_relation(s_len, r_len, 2)
    };
    (r, s)
}

/// `Σ_{k=1..=n} k`, the closed form used by the uniform end-to-end
/// checksum scenarios in TESTABLE PROPERTIES.
pub fn triangular(n: u64) -> u64 {
    n * (n + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_relations_have_payload_equal_to_key() {
        let (r, s) = seeded_relations(200, 800, 0.0);
        assert!(r.tuples.iter().all(|t| t.payload == t.key));
        assert!(s.tuples.iter().all(|t| t.payload == t.key));
        assert_eq!(r.len(), 200);
        assert_eq!(s.len(), 800);
    }

    #[test]
    fn seeded_relations_with_skew_use_the_zipf_generator() {
        let (r, s) = seeded_relations(1000, 5000, 1.2);
        assert!(s.tuples.iter().all(|t| (1..=r.len() as u32).contains(&t.key)));
    }

    #[test]
    fn triangular_matches_the_closed_form() {
        assert_eq!(triangular(1024), 524_800);
    }
}
