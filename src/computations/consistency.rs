//! Consistency: does the rule set of a slice admit at least one configuration?

use crate::engine::{Computation, SingleComputation, SliceContext, StatusBuilder};
use crate::error::Result;
use crate::formula::{Assignment, Formula};
use crate::slice::SliceType;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyResult {
    pub consistent: bool,
    /// Codes of the features selected in an example configuration.
    pub example: Option<Vec<String>>,
    /// Labels of a minimal set of rules without a common configuration. Only
    /// computed when the request asks for all details.
    pub explanation: Option<Vec<String>>,
}

impl ConsistencyResult {
    fn consistent(assignment: &Assignment) -> Self {
        ConsistencyResult {
            consistent: true,
            example: Some(assignment.positive().into_iter().map(str::to_string).collect()),
            explanation: None,
        }
    }

    fn inconsistent(explanation: Option<Vec<String>>) -> Self {
        ConsistencyResult { consistent: false, example: None, explanation }
    }
}

/// What the response reports beside the verdict of a SPLIT key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyComputation;

impl ConsistencyComputation {
    fn inconsistent(&self, ctx: &SliceContext<'_>, constraints: &[Formula]) -> Result<ConsistencyResult> {
        let explanation = if ctx.request.compute_all_details { Some(explain(ctx, constraints)?) } else { None };
        Ok(ConsistencyResult::inconsistent(explanation))
    }
}

/// Shrink the active rules to a minimal subset that, together with the
/// constraints, still has no configuration. Each rule is dropped in turn and
/// stays out if the rest remains unsatisfiable.
fn explain(ctx: &SliceContext<'_>, constraints: &[Formula]) -> Result<Vec<String>> {
    let rules = ctx.slice_set.rules();
    let inactive: BTreeSet<String> = rules
        .iter()
        .flat_map(|r| r.formula.variables())
        .filter(|v| !ctx.translation.features.contains(v))
        .collect();
    let hard: Vec<Formula> =
        inactive.into_iter().map(|v| Formula::not(Formula::Var(v))).chain(constraints.iter().cloned()).collect();

    let unsatisfiable = |kept: &[bool]| -> Result<bool> {
        let mut solver = ctx.new_solver();
        for formula in &hard {
            solver.add(formula.clone());
        }
        for (rule, _) in rules.iter().zip(kept).filter(|(_, keep)| **keep) {
            solver.add(rule.formula.clone());
        }
        Ok(solver.solve(&[])?.is_none())
    };

    let mut kept = vec![true; rules.len()];
    for idx in 0..rules.len() {
        kept[idx] = false;
        if !unsatisfiable(&kept)? {
            kept[idx] = true;
        }
    }
    Ok(rules.iter().zip(&kept).filter(|(_, keep)| **keep).map(|(rule, _)| rule.label.clone()).collect())
}

impl Computation for ConsistencyComputation {
    type Result = ConsistencyResult;

    fn name(&self) -> &'static str {
        "consistency"
    }

    fn compute_for_slice(&self, ctx: &SliceContext<'_>, status: &mut StatusBuilder) -> Result<ConsistencyResult> {
        let mut solver = ctx.rule_solver();
        let Some(assignment) = solver.solve(&[])? else {
            status.add_warning(format!("rule set for slice {} is inconsistent", ctx.slice()));
            return self.inconsistent(ctx, &[]);
        };

        let constraints = ctx.additional_constraints()?;
        if constraints.is_empty() {
            return Ok(ConsistencyResult::consistent(&assignment));
        }
        for constraint in &constraints {
            solver.add(constraint.clone());
        }
        match solver.solve(&[])? {
            Some(assignment) => Ok(ConsistencyResult::consistent(&assignment)),
            None => {
                status.add_warning(format!(
                    "rule set for slice {} is inconsistent with the additional constraints",
                    ctx.slice()
                ));
                self.inconsistent(ctx, &constraints)
            }
        }
    }

    /// ANY keeps a consistent witness, ALL keeps an inconsistent one.
    fn merge_internal_result(
        &self,
        existing: ConsistencyResult,
        new: ConsistencyResult,
        slice_type: SliceType,
    ) -> ConsistencyResult {
        match slice_type {
            SliceType::All if !existing.consistent => existing,
            SliceType::All => new,
            _ if existing.consistent => existing,
            _ => new,
        }
    }

    fn default_result(&self) -> ConsistencyResult {
        ConsistencyResult::inconsistent(None)
    }
}

impl SingleComputation for ConsistencyComputation {
    type Main = bool;
    type Detail = ConsistencyDetail;

    fn extract_main_result(&self, result: &ConsistencyResult) -> bool {
        result.consistent
    }

    fn extract_detail(&self, result: &ConsistencyResult) -> Option<ConsistencyDetail> {
        if result.example.is_none() && result.explanation.is_none() {
            return None;
        }
        Some(ConsistencyDetail { example: result.example.clone(), explanation: result.explanation.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, ReferenceBackend, Solver, Translation};
    use crate::formula::Literal;
    use crate::model::{Activation, RuleModel};
    use crate::{ComputationRequest, Context, Options, run_single_with};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reference backend whose solvers count `solve` calls.
    struct CountingBackend {
        inner: ReferenceBackend,
        solves: Arc<AtomicUsize>,
    }

    struct CountingSolver {
        inner: Box<dyn Solver>,
        solves: Arc<AtomicUsize>,
    }

    impl Backend for CountingBackend {
        fn transpile(&self, model: &RuleModel, activation: &Activation) -> Translation {
            self.inner.transpile(model, activation)
        }

        fn translate_constraint(&self, constraint: &str, translation: &Translation) -> Result<Formula> {
            self.inner.translate_constraint(constraint, translation)
        }

        fn new_solver(&self) -> Box<dyn Solver> {
            Box::new(CountingSolver { inner: self.inner.new_solver(), solves: Arc::clone(&self.solves) })
        }
    }

    impl Solver for CountingSolver {
        fn add(&mut self, formula: Formula) {
            self.inner.add(formula);
        }

        fn solve(&mut self, assumptions: &[Literal]) -> Result<Option<Assignment>> {
            self.solves.fetch_add(1, Ordering::SeqCst);
            self.inner.solve(assumptions)
        }
    }

    fn result(consistent: bool) -> ConsistencyResult {
        ConsistencyResult { consistent, example: consistent.then(Vec::new), explanation: None }
    }

    #[test]
    fn any_is_disjunctive_and_all_is_conjunctive() {
        let c = ConsistencyComputation;
        for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
            assert_eq!(c.merge_internal_result(result(a), result(b), SliceType::Any).consistent, a || b);
            assert_eq!(c.merge_internal_result(result(a), result(b), SliceType::All).consistent, a && b);
        }
    }

    #[test]
    fn unconstrained_check_solves_once() {
        let model = RuleModel::from_json(r#"{ "features": [{ "code": "A" }], "rules": [{ "formula": { "var": "A" } }] }"#).unwrap();
        let backend = CountingBackend { inner: ReferenceBackend::new(8), solves: Arc::new(AtomicUsize::new(0)) };
        let request = ComputationRequest { rule_file_id: "m".into(), ..Default::default() };
        let response =
            run_single_with(&ConsistencyComputation, &request, &model, &backend, &Context::default(), &Options::default())
                .unwrap();

        assert!(response.results[0].result);
        assert_eq!(backend.solves.load(Ordering::SeqCst), 1);
        assert_eq!(response.details[&1][0].detail.example, Some(vec!["A".to_string()]));
    }

    #[test]
    fn bare_inconsistency_has_no_detail() {
        let c = ConsistencyComputation;
        assert_eq!(c.extract_detail(&result(false)), None);
        let explained = ConsistencyResult::inconsistent(Some(vec!["r1".into()]));
        assert_eq!(c.extract_detail(&explained).and_then(|d| d.explanation), Some(vec!["r1".to_string()]));
    }
}
