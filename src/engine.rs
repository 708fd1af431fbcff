//! Slicing engine.
//!
//! The engine turns one computation request into per-slice results. The work
//! is split into focused submodules under `src/engine/`:
//!
//! ```text
//! ComputationRequest
//!        │  validate_and_augment            (selection.rs)
//!        v
//! Vec<SliceSelection>
//!        │  compute_all_slices              (factorizer.rs)
//!        v
//! Vec<Slice> ── explosion guard (max_slices)
//!        │  compute_slice_sets              (grouping.rs)
//!        v
//! Vec<SliceSet> ── one transpile + compute_for_slice each
//!        │                                  (computation.rs)
//!        v
//! merged result per SPLIT key ── response entries (merge.rs)
//!        │
//!        v
//! ComputationStatus                         (metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `selection.rs`: validates the request's slice selection against the
//!   model and fills in defaults.
//! - `factorizer.rs`: cartesian product of relevant values, bounded by
//!   `Options::max_slices`.
//! - `grouping.rs`: groups slices by the identity of the objects they
//!   activate so every distinct rule set is solved once.
//! - `computation.rs`: the `Computation` traits and the shared driver,
//!   including the two-level ALL/ANY merge.
//! - `merge.rs`: groups SPLIT keys with equal results into response entries
//!   and collapses each entry's keys into value lists and interval windows.
//! - `metrics.rs`: status, statistics and timing.
//!
//! ## Adding a computation
//!
//! Implement [`Computation`] plus either [`SingleComputation`] or
//! [`ListComputation`]; the driver does the rest. See `src/computations/` for
//! the shipped ones.

#[path = "engine/computation.rs"]
mod computation;
#[path = "engine/factorizer.rs"]
mod factorizer;
#[path = "engine/grouping.rs"]
mod grouping;
#[path = "engine/merge.rs"]
mod merge;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/selection.rs"]
mod selection;

pub use computation::{Computation, ListComputation, SingleComputation, SliceContext};
pub use factorizer::{DEFAULT_MAX_SLICES, compute_all_slices};
pub use grouping::{SliceSet, compute_slice_sets};
pub use metrics::{ComputationStatistics, ComputationStatus, ComputationVariant, StatusBuilder};
