use crate::backend::{Backend, ReferenceBackend};
use crate::engine::{
    ComputationStatus, ComputationVariant, DEFAULT_MAX_SLICES, ListComputation, SingleComputation, StatusBuilder,
};
use crate::error::{EngineError, Result};
use crate::model::RuleModel;
use crate::property::{PropertyType, RangeSpec};
use crate::slice::{Slice, SliceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Environment variable overriding [`Options::max_slices`].
pub const ENV_MAX_SLICES: &str = "SLICEWISE_MAX_SLICES";
/// Environment variable overriding [`Options::max_solver_variables`].
pub const ENV_MAX_SOLVER_VARIABLES: &str = "SLICEWISE_MAX_SOLVER_VARIABLES";

/// Request-scoped context.
#[derive(Debug, Clone)]
pub struct Context {
    /// Identifier echoed in the response status.
    pub job_id: String,
}

impl Default for Context {
    fn default() -> Self {
        Self { job_id: "local".to_string() }
    }
}

/// Limits that apply to every computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Upper bound on the number of slices one request may produce.
    pub max_slices: usize,
    /// Upper bound on the variables the reference solver enumerates.
    pub max_solver_variables: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { max_slices: DEFAULT_MAX_SLICES, max_solver_variables: 20 }
    }
}

impl Options {
    /// Defaults, overridden by `SLICEWISE_MAX_SLICES` and
    /// `SLICEWISE_MAX_SOLVER_VARIABLES` when they hold positive integers.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: usize| match lookup(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => {
                    warn!(variable = key, value = %raw, "ignoring invalid limit");
                    default
                }
            },
        };
        let defaults = Options::default();
        Options {
            max_slices: read(ENV_MAX_SLICES, defaults.max_slices),
            max_solver_variables: read(ENV_MAX_SOLVER_VARIABLES, defaults.max_solver_variables),
        }
    }
}

// --- Request -----------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationRequest {
    #[serde(default)]
    pub rule_file_id: String,
    #[serde(default)]
    pub slice_selection: Vec<PropertySelection>,
    #[serde(default)]
    pub additional_constraints: Vec<String>,
    /// Ask computations for their expensive details (e.g. explanations of
    /// inconsistent slices) on every SPLIT key.
    #[serde(default)]
    pub compute_all_details: bool,
}

impl ComputationRequest {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| EngineError::InvalidRequest(format!("cannot read request: {e}")))
    }
}

/// One entry of `sliceSelection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySelection {
    pub property: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub range: RangeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_type: Option<SliceType>,
}

// --- Response ----------------------------------------------------------------

/// SPLIT keys sharing one result.
#[derive(Debug, Clone, Serialize)]
pub struct SliceComputationResult<R> {
    pub id: usize,
    pub result: R,
    pub slices: Vec<Slice>,
}

/// The detail a computation reported for one SPLIT key.
#[derive(Debug, Clone, Serialize)]
pub struct SplitComputationDetail<D> {
    pub slice: Slice,
    pub detail: D,
}

/// Details by the id of the response entry their SPLIT key belongs to.
pub type SplitDetails<D> = BTreeMap<usize, Vec<SplitComputationDetail<D>>>;

#[derive(Debug, Clone, Serialize)]
pub struct SingleComputationResponse<M, D> {
    pub status: ComputationStatus,
    pub results: Vec<SliceComputationResult<M>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: SplitDetails<D>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputationElement<E> {
    pub id: usize,
    pub content: E,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputationElementResult<E, R> {
    pub element: ComputationElement<E>,
    pub results: Vec<SliceComputationResult<R>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListComputationResponse<E, R> {
    pub status: ComputationStatus,
    pub results: Vec<ComputationElementResult<E, R>>,
}

// --- Entry points ------------------------------------------------------------

/// Run a single-result computation with the reference backend.
///
/// # Example
/// ```
/// use slicewise::{ComputationRequest, ConsistencyComputation, Context, Options, RuleModel, run_single};
///
/// let model = RuleModel::from_json(r#"{ "features": [{ "code": "A" }], "rules": [{ "formula": { "var": "A" } }] }"#).unwrap();
/// let request = ComputationRequest { rule_file_id: "demo".into(), ..Default::default() };
/// let response = run_single(&ConsistencyComputation, &request, &model, &Context::default(), &Options::default()).unwrap();
/// assert!(response.results[0].result);
/// ```
pub fn run_single<C: SingleComputation>(
    computation: &C,
    request: &ComputationRequest,
    model: &RuleModel,
    context: &Context,
    options: &Options,
) -> Result<SingleComputationResponse<C::Main, C::Detail>> {
    let backend = ReferenceBackend::new(options.max_solver_variables);
    run_single_with(computation, request, model, &backend, context, options)
}

/// Run a single-result computation with a caller-supplied backend.
pub fn run_single_with<C: SingleComputation>(
    computation: &C,
    request: &ComputationRequest,
    model: &RuleModel,
    backend: &dyn Backend,
    context: &Context,
    options: &Options,
) -> Result<SingleComputationResponse<C::Main, C::Detail>> {
    let mut status = StatusBuilder::new(&context.job_id, &request.rule_file_id, ComputationVariant::Single);
    let (results, details) = computation.compute_response(request, model, backend, options, &mut status)?;
    let status = status.build();
    log_finished(computation.name(), context, &status, results.len());
    Ok(SingleComputationResponse { status, results, details })
}

/// Run a list computation with the reference backend.
pub fn run_list<C: ListComputation>(
    computation: &C,
    request: &ComputationRequest,
    model: &RuleModel,
    context: &Context,
    options: &Options,
) -> Result<ListComputationResponse<C::Element, C::ElementResult>> {
    let backend = ReferenceBackend::new(options.max_solver_variables);
    run_list_with(computation, request, model, &backend, context, options)
}

/// Run a list computation with a caller-supplied backend.
pub fn run_list_with<C: ListComputation>(
    computation: &C,
    request: &ComputationRequest,
    model: &RuleModel,
    backend: &dyn Backend,
    context: &Context,
    options: &Options,
) -> Result<ListComputationResponse<C::Element, C::ElementResult>> {
    let mut status = StatusBuilder::new(&context.job_id, &request.rule_file_id, ComputationVariant::List);
    let results = computation.compute_response(request, model, backend, options, &mut status)?;
    let status = status.build();
    log_finished(computation.name(), context, &status, results.len());
    Ok(ListComputationResponse { status, results })
}

fn log_finished(name: &str, context: &Context, status: &ComputationStatus, entries: usize) {
    info!(
        computation = name,
        job_id = %context.job_id,
        slices = status.statistics.number_of_slices,
        slice_computations = status.statistics.number_of_slice_computations,
        entries,
        success = status.success,
        "computation finished"
    );
}
