//! Fatal, categorized errors for the join engine.
//!
//! Every internal inconsistency the engine can detect — a topology that
//! can't host the requested thread count, an allocation failure, a radix
//! plan that violates the divisibility invariants, staged-barrier misuse —
//! is fatal: there is no retry and no partial success. `JoinError` names
//! which invariant was violated so the caller can print a specific message
//! before aborting.

use thiserror::Error;

/// Errors raised by the core join engine.
#[derive(Debug, Error)]
pub enum JoinError {
    /// The requested thread count can't be placed on the discovered topology.
    #[error("topology mismatch: requested {requested} threads but only {available} hardware threads are usable (utilized_llcs={utilized_llcs} > num_llcs={num_llcs})")]
    TopologyMismatch {
        requested: usize,
        available: usize,
        utilized_llcs: usize,
        num_llcs: usize,
    },

    /// A hash table or scratch buffer could not be allocated.
    #[error("allocation failure: {detail}")]
    AllocationFailure { detail: String },

    /// A radix plan violates one of the invariants in DATA MODEL / §9.
    #[error("radix plan invariant violated: {detail}")]
    PlanInvariantViolation { detail: String },

    /// A staged barrier was invoked an inconsistent number of times by some thread.
    #[error("staged barrier misuse: {detail}")]
    BarrierMisuse { detail: String },

    /// A caller passed a value that can never produce a valid run (CLI or library boundary).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A worker thread panicked; the run cannot report partial results.
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Convenience alias used throughout the core engine.
pub type Result<T> = std::result::Result<T, JoinError>;
