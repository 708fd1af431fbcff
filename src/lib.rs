//! Slice-based configuration analysis.
//!
//! A product model declares *slicing properties* (series, model year, market,
//! ...). Features and rules are only valid for some of their values. An
//! analysis such as consistency or buildability is answered per *slice*, a
//! concrete value for every slicing property, and the per-slice answers are
//! combined according to the discipline the caller picked for each property:
//!
//! ```text
//! SPLIT  report every value on its own
//! ALL    the answer must hold for every value
//! ANY    one value with a positive answer is enough
//! ```
//!
//! Slices that activate exactly the same feature definitions and rules are
//! solved once. See [`engine`] for the pipeline and [`computations`] for the
//! shipped analyses.

#[macro_use]
mod macros;

pub mod backend;
pub mod computations;
pub mod definition;
pub mod engine;
pub mod error;
pub mod formula;
pub mod model;
pub mod property;
pub mod slice;

mod api;

pub use api::{
    ComputationElement, ComputationElementResult, ComputationRequest, Context, ENV_MAX_SLICES,
    ENV_MAX_SOLVER_VARIABLES, ListComputationResponse, Options, PropertySelection, SingleComputationResponse,
    SliceComputationResult, SplitComputationDetail, SplitDetails, run_list, run_list_with, run_single, run_single_with,
};
pub use backend::{Backend, ReferenceBackend, Solver, Translation};
pub use computations::{BuildabilityComputation, ConsistencyComputation, ConsistencyDetail, FeatureStatus};
pub use definition::{PropertyStore, SlicingPropertyDefinition};
pub use engine::{
    Computation, ComputationStatus, ListComputation, SingleComputation, SliceContext, SliceSet, StatusBuilder,
    compute_all_slices, compute_slice_sets,
};
pub use error::{EngineError, Result};
pub use model::RuleModel;
pub use property::{Property, PropertyRange, PropertyType, PropertyValue, Range, RangeSpec};
pub use slice::{Slice, SliceSelection, SliceType, SliceTypeSet, evaluate_properties};
