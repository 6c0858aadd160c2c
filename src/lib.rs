//! # colbp_join
//!
//! A parallel, cache- and NUMA-aware in-memory radix hash join engine.
//! Given two relations `R` (the build side) and `S` (the probe side) of
//! fixed-width `(key, payload)` tuples, `colbp_join` partitions each
//! thread's share of both relations in place (ICP), detects skew on S and
//! rewrites its plan mid-run if every thread agrees the skew is heavy
//! enough to matter, then builds and probes hash tables under whichever
//! ColBP model the plan selects.
//!
//! ## Quick Start
//!
//! ```no_run
//! use colbp_join::context::JoinContext;
//! use colbp_join::engine::run_join;
//! use colbp_join::gen::{primary_key_relation, uniform_foreign_key_relation};
//! use colbp_join::topology::Topology;
//!
//! # fn main() -> colbp_join::error::Result<()> {
//! let topology = Topology::discover()?;
//! let mut r = primary_key_relation(1_000_000, 1);
//! let mut s = uniform_foreign_key_relation(1_000_000, 1_000_000, 2);
//!
//! let ctx = JoinContext::build(topology, 8, false, r.len(), 0.0, None)?;
//! let (matches, checksum) = run_join(&ctx, &mut r, &mut s)?;
//! println!("matches={matches} checksum={checksum}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`topology`] discovers the LLC → core → hardware-thread hierarchy.
//! - [`placement`] maps a requested thread count onto that hierarchy,
//!   guaranteeing the round-robin `group == tid % num_groups` invariant
//!   every ColBP model relies on.
//! - [`plan`] selects (or accepts a user-pinned) `(R_bits, S_bits)` radix
//!   plan and the ColBP model it implies.
//! - [`relation`] is the tuple/relation data model and the disjoint-slice
//!   split that gives every worker its own window with no unsafe code.
//! - [`icp`] is in-place cache-aware partitioning, run independently by
//!   every thread on its own sub-relation, plus skew estimation.
//! - [`barrier`] provides the two rendezvous primitives workers share:
//!   a blocking, reusable [`barrier::Barrier`] for low-frequency phase
//!   transitions and a busy-waiting [`barrier::StagedBarrier`] for
//!   ColBP's high-frequency build/probe rotation.
//! - [`hashtable`] is the array-of-buckets perfect hash table every ColBP
//!   model builds into.
//! - [`colbp`] implements the four Collaborative Build-and-Probe models.
//! - [`context`] consolidates topology, placement, plan, and barriers into
//!   one value built by the driver and shared by reference with workers.
//! - [`worker`] is the per-thread entry point: ICP(S), skew rendezvous,
//!   ICP(R), then dispatch into ColBP.
//! - [`engine`] spawns and pins one OS thread per worker and reduces their
//!   results.
//! - [`gen`] generates primary/foreign-key relations (uniform and Zipfian)
//!   for the CLI and benchmarks; [`testing`] seeds reproducible relations
//!   for tests.
//! - [`metrics`] is an optional counter/gauge/histogram collector (feature
//!   `metrics`, enabled by default) for reporting run statistics.
//!
//! ## Error Handling
//!
//! Every internal inconsistency the engine can detect — a topology that
//! can't host the requested thread count, an allocation failure, a radix
//! plan that violates its divisibility invariants, staged-barrier misuse
//! — is represented by [`error::JoinError`] and is fatal: there is no
//! retry and no partial success.

pub mod barrier;
pub mod colbp;
pub mod context;
pub mod engine;
pub mod error;
pub mod gen;
pub mod hashtable;
pub mod icp;
pub mod placement;
pub mod plan;
pub mod relation;
pub mod testing;
pub mod topology;
pub mod worker;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use context::JoinContext;
pub use engine::run_join;
pub use error::{JoinError, Result};
pub use relation::{Relation, RelationId, Tuple};
pub use topology::Topology;
