//! The computation protocol and its driver.
//!
//! A concrete analysis implements [`Computation`] (how to compute one slice
//! set and how to merge two results) plus one of the two response variants,
//! [`SingleComputation`] or [`ListComputation`]. Everything else is shared:
//!
//! ```text
//! request ── validate_and_augment ── compute_all_slices ── compute_slice_sets
//!                                                                │
//!            ┌───────────────────────────────────────────────────┘
//!            v
//!   for each SliceSet: transpile once, compute_for_slice once
//!            │            (scoped error -> default_result + status error)
//!            v
//!   fan out to every slice of the set
//!            │
//!            v
//!   merge per SPLIT key:  fold ALL coordinates, then ANY coordinates
//!            │
//!            v
//!   group SPLIT keys by equal result -> response entries (ids from 1)
//!            │
//!            v
//!   merge the SPLIT keys of each entry into fewer slices
//! ```

use super::factorizer::compute_all_slices;
use super::grouping::{SliceSet, compute_slice_sets};
use super::merge::{self, SliceMerger};
use super::metrics::StatusBuilder;
use super::selection::validate_and_augment;
use crate::api::{ComputationElementResult, ComputationRequest, Options, SliceComputationResult, SplitDetails};
use crate::backend::{Backend, Solver, Translation};
use crate::error::Result;
use crate::formula::Formula;
use crate::model::RuleModel;
use crate::slice::{Slice, SliceType, SliceTypeSet};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, warn};

/// Everything one slice set computation gets to see.
pub struct SliceContext<'a> {
    pub request: &'a ComputationRequest,
    pub model: &'a RuleModel,
    pub slice_set: &'a SliceSet,
    pub translation: &'a Translation,
    pub backend: &'a dyn Backend,
}

impl SliceContext<'_> {
    /// The slice the set is computed for.
    pub fn slice(&self) -> &Slice {
        self.slice_set.representative()
    }

    pub fn new_solver(&self) -> Box<dyn Solver> {
        self.backend.new_solver()
    }

    /// A fresh solver loaded with the transpiled rules of this slice set.
    pub fn rule_solver(&self) -> Box<dyn Solver> {
        let mut solver = self.new_solver();
        for formula in &self.translation.formulas {
            solver.add(formula.clone());
        }
        solver
    }

    /// Translate the request's additional constraints for this slice set.
    pub fn additional_constraints(&self) -> Result<Vec<Formula>> {
        self.request
            .additional_constraints
            .iter()
            .map(|c| self.backend.translate_constraint(c, self.translation))
            .collect()
    }
}

pub trait Computation {
    /// Result of one slice set computation.
    type Result: Clone;

    fn name(&self) -> &'static str;

    fn allowed_slice_types(&self) -> SliceTypeSet {
        SliceTypeSet::all()
    }

    /// Discipline for properties the request does not select explicitly.
    fn default_slice_type(&self) -> SliceType {
        SliceType::Any
    }

    fn compute_for_slice(&self, ctx: &SliceContext<'_>, status: &mut StatusBuilder) -> Result<Self::Result>;

    /// Combine two results of the same SPLIT key. Must be associative and
    /// commutative; `slice_type` is `All` or `Any`.
    fn merge_internal_result(&self, existing: Self::Result, new: Self::Result, slice_type: SliceType) -> Self::Result;

    /// Result used for a slice set whose computation failed.
    fn default_result(&self) -> Self::Result;
}

/// A computation reporting one main result per SPLIT key.
pub trait SingleComputation: Computation + Sized {
    type Main: Clone + PartialEq + Serialize;
    /// Per-key information reported beside the main result, `()` when there is none.
    type Detail: Clone + Serialize;

    fn extract_main_result(&self, result: &Self::Result) -> Self::Main;

    fn extract_detail(&self, _result: &Self::Result) -> Option<Self::Detail> {
        None
    }

    /// Response entries plus the details of their SPLIT keys by entry id.
    fn compute_response(
        &self,
        request: &ComputationRequest,
        model: &RuleModel,
        backend: &dyn Backend,
        options: &Options,
        status: &mut StatusBuilder,
    ) -> Result<(Vec<SliceComputationResult<Self::Main>>, SplitDetails<Self::Detail>)> {
        let (merged, merger) = compute_merged(self, request, model, backend, options, status)?;
        Ok(merge::single_results(self, merged, &merger))
    }
}

/// A computation reporting a result per element (e.g. per feature) and SPLIT key.
pub trait ListComputation: Computation + Sized {
    type Element: Ord + Clone + Serialize;
    type ElementResult: Clone + PartialEq + Serialize;

    fn extract_elements(&self, result: &Self::Result) -> BTreeSet<Self::Element>;

    /// The element's result, or `None` when the element does not occur.
    fn extract_internal_result(&self, element: &Self::Element, result: &Self::Result) -> Option<Self::ElementResult>;

    /// Result for elements absent from a merged result.
    fn default_element_result(&self) -> Self::ElementResult;

    fn compute_response(
        &self,
        request: &ComputationRequest,
        model: &RuleModel,
        backend: &dyn Backend,
        options: &Options,
        status: &mut StatusBuilder,
    ) -> Result<Vec<ComputationElementResult<Self::Element, Self::ElementResult>>> {
        let (merged, merger) = compute_merged(self, request, model, backend, options, status)?;
        Ok(merge::list_results(self, merged, &merger))
    }
}

/// Run the shared pipeline and return one merged result per SPLIT key, in
/// order of first appearance, with the merger for the response slices.
pub(crate) fn compute_merged<C: Computation>(
    computation: &C,
    request: &ComputationRequest,
    model: &RuleModel,
    backend: &dyn Backend,
    options: &Options,
    status: &mut StatusBuilder,
) -> Result<(Vec<(Slice, C::Result)>, SliceMerger)> {
    let selections = validate_and_augment(
        request,
        model.store(),
        computation.allowed_slice_types(),
        computation.default_slice_type(),
    )?;
    for definition in model.store().definitions().iter().filter(|d| d.is_unused()) {
        status.add_info(format!("slicing property '{}' is not used by any feature or rule", definition.name()));
    }
    let slices = compute_all_slices(&selections, model.store().definitions(), options.max_slices)?;
    status.record_slices(slices.len());
    let slice_sets = compute_slice_sets(slices, model);
    debug!(computation = computation.name(), slice_sets = slice_sets.len(), "computing slice sets");

    let mut fanned: Vec<(Slice, C::Result)> = Vec::new();
    for slice_set in &slice_sets {
        let started = Instant::now();
        let translation = backend.transpile(model, &slice_set.activation);
        let ctx = SliceContext { request, model, slice_set, translation: &translation, backend };
        let result = match computation.compute_for_slice(&ctx, status) {
            Ok(result) => result,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(computation = computation.name(), slice = %ctx.slice(), error = %err, "slice set degraded");
                status.add_error(format!("slice {}: {err}", ctx.slice()));
                computation.default_result()
            }
        };
        status.record_slice_computation(started.elapsed());
        fanned.extend(slice_set.slices.iter().map(|slice| (slice.clone(), result.clone())));
    }

    status.record_slice_sets(
        slice_sets.iter().map(|set| set.slices.iter().map(|s| s.filter(SliceTypeSet::SPLIT)).collect()).collect(),
    );
    let merged = merge_by_split_key(computation, fanned);
    let merger = SliceMerger::new(&selections, model.store(), merged.iter().map(|(key, _)| key));
    Ok((merged, merger))
}

/// Fold results sharing a SPLIT key: first across ALL coordinates (per ANY
/// key), then across ANY coordinates.
fn merge_by_split_key<C: Computation>(computation: &C, fanned: Vec<(Slice, C::Result)>) -> Vec<(Slice, C::Result)> {
    let mut groups: Vec<(Slice, Vec<Vec<C::Result>>)> = Vec::new();
    let mut split_index: HashMap<Slice, usize> = HashMap::new();
    let mut any_index: HashMap<(usize, Slice), usize> = HashMap::new();

    for (slice, result) in fanned {
        let split = slice.filter(SliceTypeSet::SPLIT);
        let group = match split_index.get(&split) {
            Some(&idx) => idx,
            None => {
                split_index.insert(split.clone(), groups.len());
                groups.push((split, Vec::new()));
                groups.len() - 1
            }
        };
        let any_groups = &mut groups[group].1;
        let key = (group, slice.filter(SliceTypeSet::ANY));
        match any_index.get(&key) {
            Some(&idx) => any_groups[idx].push(result),
            None => {
                any_index.insert(key, any_groups.len());
                any_groups.push(vec![result]);
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|(split, any_groups)| {
            any_groups
                .into_iter()
                .filter_map(|all| all.into_iter().reduce(|a, b| computation.merge_internal_result(a, b, SliceType::All)))
                .reduce(|a, b| computation.merge_internal_result(a, b, SliceType::Any))
                .map(|merged| (split, merged))
        })
        .collect()
}
