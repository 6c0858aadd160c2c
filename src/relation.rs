//! The data model (§3): tuples, relations, and sub-relations.

/// A fixed-width (key, payload) record. Both fields are 32-bit unsigned,
/// per the DATA MODEL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tuple {
    pub key: u32,
    pub payload: u32,
}

/// Which side of the join a relation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationId {
    /// Build side: primary keys, a permutation of `[1..=len]`.
    R,
    /// Probe side: foreign keys drawn from R's key range.
    S,
}

/// An owned relation: an identifier, its tuple array, and its size.
pub struct Relation {
    pub id: RelationId,
    pub tuples: Vec<Tuple>,
}

impl Relation {
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

/// Split `tuples` into `n` disjoint, contiguous, mutable sub-slices sized
/// per [`crate::placement::sub_relation_span`]: `len / n` each, plus one
/// extra tuple for the first `len % n` sub-relations. Each returned slice
/// is a thread's `SubR` or `SubS`.
///
/// This gives every worker a private `&mut [Tuple]` window into the shared
/// relation with no unsafe code and no locking: the borrow checker proves
/// the slices are disjoint because they're produced by repeated
/// `split_at_mut`.
pub fn split_relation_mut(tuples: &mut [Tuple], n: usize) -> Vec<&mut [Tuple]> {
    let len = tuples.len();
    let mut rest = tuples;
    let mut out = Vec::with_capacity(n);
    let mut consumed = 0usize;
    for t in 0..n {
        let (_offset, count) = crate::placement::sub_relation_span(len, n, t);
        let (head, tail) = rest.split_at_mut(count);
        out.push(head);
        rest = tail;
        consumed += count;
    }
    debug_assert_eq!(consumed, len);
    out
}
